use crate::core::SessionDriver;
use crate::errors::Result;
use std::path::{Path, PathBuf};

pub struct ScreenshotManager;

impl ScreenshotManager {
    /// Timestamp suffix for failure artifacts: `dd_MM_yyyy_hh_mm_ss`.
    pub fn timestamp() -> String {
        chrono::Local::now().format("%d_%m_%Y_%I_%M_%S").to_string()
    }

    pub async fn save_to_file(driver: &dyn SessionDriver, file_path: &Path) -> Result<()> {
        let screenshot_bytes = driver.capture_screenshot().await?;
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(file_path, screenshot_bytes).await?;
        Ok(())
    }

    /// Captures the current page into `<dir>/<name>_<timestamp>.png`.
    pub async fn save_failure(
        driver: &dyn SessionDriver,
        dir: &Path,
        name: &str,
    ) -> Result<PathBuf> {
        let path = dir.join(format!("{}_{}.png", name, Self::timestamp()));
        Self::save_to_file(driver, &path).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[tokio::test]
    async fn test_failure_capture_written_under_dir() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let path = ScreenshotManager::save_failure(&driver, &dir.path().join("shots"), "full_submission")
            .await
            .unwrap();

        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("full_submission_"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), MockDriver::SCREENSHOT_BYTES.to_vec());
    }
}
