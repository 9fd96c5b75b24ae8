//! File access through `cap_std` directory handles.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};

use crate::error::CliError;

/// Reads `path` as UTF-8 text.
pub fn read_text(path: &Utf8Path) -> Result<String, CliError> {
    let (parent, name) = split(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| CliError::io(parent, err))?;
    dir.read_to_string(name).map_err(|err| CliError::io(path, err))
}

/// Writes `content` to `file_name` inside `out_dir`, creating the directory
/// when missing and replacing any previous file.
pub fn write_text(out_dir: &Utf8Path, file_name: &str, content: &str) -> Result<Utf8PathBuf, CliError> {
    let dir = ensure_dir(out_dir)?;
    let file_path = out_dir.join(file_name);
    let mut file = dir
        .open_with(file_name, OpenOptions::new().write(true).create(true).truncate(true))
        .map_err(|err| CliError::io(&file_path, err))?;
    file.write_all(content.as_bytes())
        .map_err(|err| CliError::io(&file_path, err))?;
    Ok(file_path)
}

fn split(path: &Utf8Path) -> Result<(&Utf8Path, &str), CliError> {
    let name = path.file_name().ok_or_else(|| {
        CliError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path names no file"),
        )
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((parent, name))
}

fn ensure_dir(path: &Utf8Path) -> Result<Dir, CliError> {
    match Dir::open_ambient_dir(path, ambient_authority()) {
        Ok(dir) => Ok(dir),
        Err(open_err) if open_err.kind() == std::io::ErrorKind::NotFound => {
            Dir::create_ambient_dir_all(path, ambient_authority()).map_err(|err| CliError::io(path, err))?;
            Dir::open_ambient_dir(path, ambient_authority()).map_err(|err| CliError::io(path, err))
        }
        Err(open_err) => Err(CliError::io(path, open_err)),
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use rstest::rstest;

    use super::{read_text, write_text};
    use crate::error::CliError;

    #[rstest]
    fn writes_into_created_directories() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))?;
        let out_dir = root.join("nested").join("imports");
        let written = write_text(&out_dir, "web.rs", "fn web() {}\n")?;
        assert_eq!(written, out_dir.join("web.rs"));
        assert_eq!(read_text(&written)?, "fn web() {}\n");

        write_text(&out_dir, "web.rs", "short\n")?;
        assert_eq!(read_text(&written)?, "short\n");
        Ok(())
    }

    #[rstest]
    fn missing_files_report_their_path() {
        let err = read_text(Utf8PathBuf::from("definitely/missing/file.yaml").as_path()).expect_err("missing");
        assert!(matches!(err, CliError::Io { .. }));
        assert!(err.to_string().contains("definitely/missing"), "{err}");
    }
}
