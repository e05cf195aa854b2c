use crate::Error;
use crate::list::List;
use std::path::Path;
use tracing::warn;

/// Read a whole file into a character list
pub fn read_file(path: &Path) -> Result<List, Error> {
    let bytes = std::fs::read(path).map_err(|err| {
        warn!(path = %path.display(), %err, "cannot open file");
        Error::CantOpenFile
    })?;
    Ok(List::from_bytes(&bytes)?)
}
