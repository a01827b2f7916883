//! Bytecode image loading.

use std::fs;
use std::io;
use std::path::Path;

/// Read a whole bytecode image into memory.
///
/// The format is a raw byte stream with no header, version, or checksum;
/// any validation beyond non-emptiness happens at execution time.
pub fn load_image(path: &Path) -> io::Result<Vec<u8>> {
    let image = fs::read(path)?;
    if image.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "empty bytecode image",
        ));
    }
    log::debug!("loaded {} byte image from {}", image.len(), path.display());
    Ok(image)
}
