//! Subcommand implementations.

pub(crate) mod cert;
pub(crate) mod init;
pub(crate) mod keys;

use std::path::Path;

/// Create the data directory if needed. Directories created here are
/// owner-only on Unix; an existing directory keeps its mode.
pub(crate) fn ensure_data_dir(data_dir: &Path) -> anyhow::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(data_dir)?;
    Ok(())
}
