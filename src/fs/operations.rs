use std::{io::ErrorKind, path::Path};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncWriteExt},
};

/// Reads the whole file under a shared lock. A missing file is reported as `None` since both the
/// backup and the registry are optional.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    file.lock_shared()?;
    let mut content = String::new();
    let result = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    result?;

    Ok(Some(content))
}

/// Replaces file contents with `data` under an exclusive lock. The file is not atomically
/// replaced, a crash in the middle of the write can leave it truncated.
pub async fn write_locked(path: &Path, data: &[u8]) -> Result<(), io::Error> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;

    // Truncation has to happen after the lock is taken, otherwise a reader can observe an empty
    // file.
    file.lock_exclusive()?;
    let result = overwrite(&mut file, data).await;
    file.unlock_async().await?;
    result
}

async fn overwrite(file: &mut File, data: &[u8]) -> Result<(), io::Error> {
    file.set_len(0).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}
