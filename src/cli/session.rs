use std::{io::Write, path::PathBuf};

use ansi_term::Colour;
use anyhow::Result;
use futures::Stream;
use tokio::{io, select};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    storage::{backup::BackupStore, registry::ProjectRegistry},
    tracker::{
        collection::{TickOutcome, TimerCollection},
        schedule::{TickScheduler, TICK_INTERVAL},
        timer::{ProjectTimer, TimerState},
        TimerId,
    },
};

use super::{
    command::{parse_line, ParsedLine, SessionCommand},
    console::Console,
    export::{export_summary, Viewer},
};

pub struct SessionOptions {
    /// Used by `export` when no path is given.
    pub summary_path: PathBuf,
    /// Shows the summary after it's exported.
    pub viewer: Option<Box<dyn Viewer>>,
    pub colored: bool,
}

enum Event {
    Shutdown,
    Tick(TimerId),
    Input(Option<String>),
}

enum Flow {
    Continue,
    Quit,
}

/// Interactive session. Owns every timer for the lifetime of the process and multiplexes user
/// input, timer ticks and shutdown on a single task, so nothing here needs synchronization.
pub struct Session<S, I, W> {
    collection: TimerCollection<S>,
    registry: ProjectRegistry,
    ticks: TickScheduler,
    console: Console<I, W>,
    options: SessionOptions,
    shutdown: CancellationToken,
}

impl<S, I, W> Session<S, I, W>
where
    S: BackupStore,
    I: Stream<Item = Result<String, io::Error>> + Unpin,
    W: Write,
{
    pub fn new(
        collection: TimerCollection<S>,
        registry: ProjectRegistry,
        console: Console<I, W>,
        options: SessionOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            collection,
            registry,
            ticks: TickScheduler::new(TICK_INTERVAL),
            console,
            options,
            shutdown,
        }
    }

    pub fn collection(&self) -> &TimerCollection<S> {
        &self.collection
    }

    pub fn console(&self) -> &Console<I, W> {
        &self.console
    }

    /// Offers to bring back timers from the previous run. Nothing happens if the backup is empty.
    pub async fn offer_restore(&mut self) -> Result<()> {
        let snapshot = self.collection.store().load().await?;
        if snapshot.is_empty() {
            return Ok(());
        }

        let question = format!(
            "Previous timer data detected ({} timers). Do you want to reload them?",
            snapshot.len()
        );
        if !self.console.confirm(&question).await? {
            info!("Previous timers were not reloaded");
            return Ok(());
        }

        for id in self.collection.restore_from_backup(snapshot) {
            self.ticks.schedule(id);
        }
        self.print_timers()
    }

    /// Executes the session event loop until input is closed, `quit` is typed or shutdown is
    /// requested.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.event_loop().await;
        info!("Session finished with {} timers", self.collection.len());
        // Lets anything waiting on the token know the session is over, failed or not.
        self.shutdown.cancel();
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        self.console.say("Type `help` to see available commands")?;
        self.console.prompt()?;
        loop {
            let event = select! {
                _ = self.shutdown.cancelled() => Event::Shutdown,
                Some(id) = self.ticks.next_due(), if !self.ticks.is_empty() => Event::Tick(id),
                line = self.console.next_line() => Event::Input(line?),
            };

            match event {
                Event::Shutdown => break,
                Event::Tick(id) => self.handle_tick(id).await,
                Event::Input(None) => break,
                Event::Input(Some(line)) => {
                    if let Flow::Quit = self.handle_line(&line).await? {
                        break;
                    }
                    self.console.prompt()?;
                }
            }
        }
        Ok(())
    }

    async fn handle_tick(&mut self, id: TimerId) {
        match self.collection.tick(id).await {
            TickOutcome::Gone => debug!("Dropping tick of removed timer {id}"),
            TickOutcome::Idle | TickOutcome::Advanced(_) => self.ticks.schedule(id),
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match parse_line(line) {
            ParsedLine::Empty => Ok(Flow::Continue),
            ParsedLine::Message(message) => {
                self.console.say(message)?;
                Ok(Flow::Continue)
            }
            ParsedLine::Command(command) => {
                debug!("Executing {command:?}");
                self.execute(command).await
            }
        }
    }

    async fn execute(&mut self, command: SessionCommand) -> Result<Flow> {
        match command {
            SessionCommand::New { name, id } => self.create(name, id).await?,
            SessionCommand::Toggle { position } => {
                if let Some(id) = self.resolve(position)? {
                    if self.collection.toggle(id) == Some(TimerState::Running) {
                        self.ticks.schedule(id);
                    }
                    self.print_timer(id)?;
                }
            }
            SessionCommand::Start { position } => {
                if let Some(id) = self.resolve(position)? {
                    self.collection.start(id);
                    self.ticks.schedule(id);
                    self.print_timer(id)?;
                }
            }
            SessionCommand::Pause { position } => {
                if let Some(id) = self.resolve(position)? {
                    self.collection.pause(id);
                    self.print_timer(id)?;
                }
            }
            SessionCommand::Remove { position } => {
                if let Some(id) = self.resolve(position)? {
                    self.remove(id).await?;
                }
            }
            SessionCommand::Notes { position, text } => {
                if let Some(id) = self.resolve(position)? {
                    self.collection.set_notes(id, text.join(" ")).await;
                    self.print_timer(id)?;
                }
            }
            SessionCommand::List => self.print_timers()?,
            SessionCommand::Projects => self.print_projects()?,
            SessionCommand::Export { path } => self.export(path).await?,
            SessionCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Maps a 1-based position from `list` onto a timer.
    fn resolve(&mut self, position: usize) -> Result<Option<TimerId>> {
        let id = position
            .checked_sub(1)
            .and_then(|index| self.collection.id_at(index));
        if id.is_none() {
            self.console.say(format!("No timer at position {position}"))?;
        }
        Ok(id)
    }

    async fn create(&mut self, name: String, project_id: Option<String>) -> Result<()> {
        let project_id = match project_id {
            Some(project_id) => project_id,
            None => match self.registry.lookup(&name) {
                Some(project_id) => project_id.to_string(),
                None => {
                    warn!("Could not find '{name}' in config");
                    self.console.say(format!(
                        "Could not find '{name}' in config. Use `new \"{name}\" <id>`"
                    ))?;
                    return Ok(());
                }
            },
        };

        if let Err(e) = self.registry.record(&name, &project_id).await {
            error!("Failed to update project registry {e:?}");
        }

        let id = self.collection.create(name, project_id, "").await;
        self.ticks.schedule(id);
        self.print_timer(id)
    }

    async fn remove(&mut self, id: TimerId) -> Result<()> {
        let Some(name) = self
            .collection
            .get(id)
            .map(|timer| timer.project_name().to_string())
        else {
            return Ok(());
        };

        let confirmed = self
            .console
            .confirm(&format!("Are you sure you want to remove {name}?"))
            .await?;
        if self.collection.remove(id, confirmed).await {
            self.ticks.cancel(id);
            self.console.say(format!("Removed {name}"))?;
        }
        Ok(())
    }

    async fn export(&mut self, path: Option<PathBuf>) -> Result<()> {
        let path = path.unwrap_or_else(|| self.options.summary_path.clone());
        let rows = self.collection.export_summary();
        match export_summary(&rows, &path, self.options.viewer.as_deref()).await {
            Ok(()) => self
                .console
                .say(format!("Summary written to {}", path.display())),
            Err(e) => {
                error!("Export failed {e:?}");
                self.console.say(format!("Export failed: {e}"))
            }
        }
    }

    fn timer_line(&self, position: usize, timer: &ProjectTimer) -> String {
        let mut line = format!(
            "[{}] {:<7} {}  {} ({})  [{}]",
            position + 1,
            timer.state(),
            timer.display_time(),
            timer.project_name(),
            timer.project_id(),
            timer.action_label()
        );
        if !timer.notes().is_empty() {
            line.push_str("  ");
            line.push_str(timer.notes());
        }
        if self.options.colored && timer.is_running() {
            Colour::Green.bold().paint(line).to_string()
        } else {
            line
        }
    }

    fn print_timer(&mut self, id: TimerId) -> Result<()> {
        let line = self
            .collection
            .iter()
            .enumerate()
            .find(|(_, timer)| timer.id() == id)
            .map(|(position, timer)| self.timer_line(position, timer));
        match line {
            Some(line) => self.console.say(line),
            None => Ok(()),
        }
    }

    fn print_timers(&mut self) -> Result<()> {
        if self.collection.is_empty() {
            return self.console.say("No timers");
        }
        let lines = self
            .collection
            .iter()
            .enumerate()
            .map(|(position, timer)| self.timer_line(position, timer))
            .collect::<Vec<_>>();
        for line in lines {
            self.console.say(line)?;
        }
        Ok(())
    }

    fn print_projects(&mut self) -> Result<()> {
        if self.registry.is_empty() {
            return self.console.say("No projects yet");
        }
        let lines = self
            .registry
            .iter()
            .map(|(name, id)| format!("{name}\t{id}"))
            .collect::<Vec<_>>();
        for line in lines {
            self.console.say(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{io, path::Path, time::Duration};

    use anyhow::Result;
    use futures::{stream, Stream, StreamExt};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        cli::{console::Console, shutdown::detect_shutdown},
        storage::{
            backup::{BackupStore, JsonBackupStore},
            registry::ProjectRegistry,
        },
        tracker::{collection::TimerCollection, timer::TimerState},
        utils::{dir::AppPaths, logging::TEST_LOGGING},
    };

    use super::{Session, SessionOptions};

    type TestInput = std::pin::Pin<Box<dyn Stream<Item = io::Result<String>>>>;
    type TestSession = Session<JsonBackupStore, TestInput, Vec<u8>>;

    /// Lines are delivered one after another, each after its delay. Input stays open afterwards
    /// unless `close` is set.
    fn scripted(script: Vec<(u64, &'static str)>, close: bool) -> TestInput {
        let lines = stream::iter(script).then(|(delay_ms, line)| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<_, io::Error>(line.to_string())
        });
        if close {
            lines.boxed_local()
        } else {
            lines.chain(stream::pending()).boxed_local()
        }
    }

    async fn test_session(dir: &Path, input: TestInput) -> Result<(TestSession, CancellationToken)> {
        let paths = AppPaths::new(dir.to_path_buf());
        let shutdown = CancellationToken::new();
        let session = Session::new(
            TimerCollection::new(JsonBackupStore::new(paths.backup())),
            ProjectRegistry::load(paths.registry()).await?,
            Console::new(input, Vec::new()),
            SessionOptions {
                summary_path: paths.summary(),
                viewer: None,
                colored: false,
            },
            shutdown.clone(),
        );
        Ok((session, shutdown))
    }

    fn output(session: &TestSession) -> String {
        String::from_utf8_lossy(session.console().output()).to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_timer_is_backed_up_every_second() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let (mut session, shutdown) =
            test_session(dir.path(), scripted(vec![(0, "new Alpha A1")], false)).await?;

        let (result, _) = tokio::join!(session.run(), async {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            shutdown.cancel();
        });
        result?;

        let backup = session.collection().store().load().await?;
        assert_eq!(backup.get("A1").map(|r| r.elapsed_time), Some(3));

        let registry = ProjectRegistry::load(AppPaths::new(dir.path().into()).registry()).await?;
        assert_eq!(registry.lookup("Alpha"), Some("A1"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_timer_keeps_ticking_and_removed_stops() -> Result<()> {
        let dir = tempdir()?;
        let script = vec![
            (0, "new Alpha A1"),
            (0, "new Beta B1"),
            (2500, "remove 2"),
            (0, "y"),
            (2000, "quit"),
        ];
        let (mut session, _shutdown) = test_session(dir.path(), scripted(script, false)).await?;

        session.run().await?;

        let alpha = session.collection().id_at(0).unwrap();
        assert_eq!(session.collection().len(), 1);
        assert_eq!(
            session.collection().get(alpha).unwrap().state(),
            TimerState::Paused
        );
        assert_eq!(session.collection().get(alpha).unwrap().elapsed_seconds(), 0);
        assert!(session.ticks.is_scheduled(alpha));
        assert!(!session.ticks.is_empty());

        let backup = session.collection().store().load().await?;
        assert_eq!(backup.keys().collect::<Vec<_>>(), vec!["A1"]);
        assert!(output(&session).contains("Removed Beta"));
        Ok(())
    }

    #[tokio::test]
    async fn test_declined_removal() -> Result<()> {
        let dir = tempdir()?;
        let script = vec![(0, "new Alpha A1"), (0, "remove 1"), (0, "no"), (0, "remove 7")];
        let (mut session, _shutdown) = test_session(dir.path(), scripted(script, true)).await?;

        session.run().await?;

        assert_eq!(session.collection().len(), 1);
        let out = output(&session);
        assert!(out.contains("Are you sure you want to remove Alpha? [y/N]"));
        assert!(!out.contains("Removed Alpha"));
        assert!(out.contains("No timer at position 7"));
        Ok(())
    }

    #[tokio::test]
    async fn test_new_uses_registry() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("config.json"), r#"{"Alpha": "A1"}"#)?;
        let script = vec![(0, "new Alpha"), (0, "new Unknown"), (0, "projects")];
        let (mut session, _shutdown) = test_session(dir.path(), scripted(script, true)).await?;

        session.run().await?;

        let ids = session
            .collection()
            .iter()
            .map(|timer| timer.project_id().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["A1"]);
        let out = output(&session);
        assert!(out.contains("Could not find 'Unknown' in config"));
        assert!(out.contains("Alpha\tA1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_on_start() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join("timer_backup.json"),
            r#"{"A1": {"project_name": "Alpha", "elapsed_time": 5},
                "B1": {"project_name": "Beta", "elapsed_time": 6},
                "C1": {"project_name": "Gamma", "elapsed_time": 7, "notes": "late"}}"#,
        )?;
        let (mut session, _shutdown) = test_session(dir.path(), scripted(vec![(0, "y")], true)).await?;

        session.offer_restore().await?;

        let states = session
            .collection()
            .iter()
            .map(|timer| (timer.project_id().to_string(), timer.state()))
            .collect::<Vec<_>>();
        assert_eq!(
            states,
            vec![
                ("A1".to_string(), TimerState::Paused),
                ("B1".to_string(), TimerState::Paused),
                ("C1".to_string(), TimerState::Running)
            ]
        );
        assert!(!session.ticks.is_empty());
        assert!(output(&session).contains("00:00:07  Gamma (C1)  [Pause]  late"));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_declined() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join("timer_backup.json"),
            r#"{"A1": {"project_name": "Alpha", "elapsed_time": 5}}"#,
        )?;
        let (mut session, _shutdown) = test_session(dir.path(), scripted(vec![(0, "n")], true)).await?;

        session.offer_restore().await?;

        assert!(session.collection().is_empty());
        assert!(session.ticks.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_notes_and_export() -> Result<()> {
        let dir = tempdir()?;
        let script = vec![
            (0, "new \"Client site\" C-1"),
            (0, "toggle 1"),
            (0, "notes 1 waiting on review"),
            (0, "export"),
            (0, "list"),
        ];
        let (mut session, _shutdown) = test_session(dir.path(), scripted(script, true)).await?;

        session.run().await?;

        let timer = session.collection().iter().next().unwrap();
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.notes(), "waiting on review");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("summary.csv"))?,
            "Project ID,Project Name,Total Hours\nC-1,Client site,0.00\n"
        );
        assert!(output(&session).contains("[1] paused  00:00:00  Client site (C-1)  [Resume]  waiting on review"));
        Ok(())
    }

    #[tokio::test]
    async fn test_input_error_ends_session_and_shutdown() -> Result<()> {
        let dir = tempdir()?;
        let input = stream::iter(vec![
            Ok("new Alpha A1".to_string()),
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream did not contain valid UTF-8",
            )),
        ])
        .chain(stream::pending())
        .boxed_local();
        let (mut session, shutdown) = test_session(dir.path(), input).await?;

        let (result, detected) = tokio::join!(
            session.run(),
            tokio::time::timeout(Duration::from_secs(2), detect_shutdown(shutdown.clone()))
        );

        assert!(result.is_err());
        assert!(shutdown.is_cancelled());
        assert!(detected.is_ok());
        assert_eq!(session.collection().len(), 1);
        Ok(())
    }
}
