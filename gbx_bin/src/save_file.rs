use gbx_core::SaveBacking;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Battery RAM stored as `<save dir>/<rom stem>.sav`, raw banks without a header.
#[derive(Debug)]
pub struct SaveFile {
    path: PathBuf,
}

impl SaveFile {
    pub fn new(save_dir: &Path, rom: &Path) -> Self {
        let stem = rom.file_stem().unwrap_or(rom.as_os_str());
        Self {
            path: save_dir.join(stem).with_extension("sav"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveBacking for SaveFile {
    fn load(&mut self, data: &mut [u8]) {
        match fs::read(&self.path) {
            Ok(saved) => {
                if saved.len() != data.len() {
                    log::warn!(
                        "{} holds {} bytes, cartridge has {}",
                        self.path.display(),
                        saved.len(),
                        data.len()
                    );
                }
                let n = saved.len().min(data.len());
                data[..n].copy_from_slice(&saved[..n]);
                log::info!("loaded save from {}", self.path.display());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no save at {}", self.path.display());
            }
            Err(e) => log::warn!("failed to read {}: {}", self.path.display(), e),
        }
    }

    fn flush(&mut self, data: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, data)?;
        log::info!("wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gbx-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_path() {
        let save = SaveFile::new(Path::new("saves"), Path::new("roms/tetris.gb"));
        assert_eq!(save.path(), Path::new("saves/tetris.sav"));
    }

    #[test]
    fn test_round_trip() {
        let dir = temp_dir("round-trip");
        let mut save = SaveFile::new(&dir, Path::new("game.gbc"));

        let mut data = [0xAAu8; 8];
        save.load(&mut data);
        assert_eq!(data, [0xAA; 8]);

        save.flush(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        save.load(&mut data);
        assert_eq!(data, [1, 2, 3, 4, 5, 6, 7, 8]);

        let mut larger = [0u8; 10];
        save.load(&mut larger);
        assert_eq!(larger, [1, 2, 3, 4, 5, 6, 7, 8, 0, 0]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
