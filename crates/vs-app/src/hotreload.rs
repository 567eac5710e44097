use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use vs_core::config::{VoiceConfig, load_config};

/// Recharge `path` dans `config`. Une config invalide garde l'ancienne.
///
/// `adjust` is applied to the freshly loaded config before it is stored
/// (command-line overrides). Returns whether the config was replaced.
pub fn reload(
    path: &Path,
    config: &ArcSwap<VoiceConfig>,
    adjust: &impl Fn(&mut VoiceConfig),
) -> bool {
    match load_config(path) {
        Ok(mut new_config) => {
            adjust(&mut new_config);
            config.store(Arc::new(new_config));
            log::info!("Config rechargée depuis {}", path.display());
            true
        }
        Err(e) => {
            log::warn!("Erreur de rechargement config : {e:#}");
            false
        }
    }
}

/// Surveille le fichier config et met à jour l'ArcSwap.
///
/// The parent directory is watched so that editors replacing the file
/// (write to temp, rename) are seen too. Retourne le Watcher, qui doit rester
/// vivant tant que l'app tourne.
///
/// # Errors
/// Returns an error if the watcher cannot be created or the directory cannot be watched.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use arc_swap::ArcSwap;
/// use vs_core::config::VoiceConfig;
///
/// let config = Arc::new(ArcSwap::from_pointee(VoiceConfig::default()));
/// let _watcher = spawn_config_watcher(Path::new("config/default.toml"), &config, |_| {});
/// ```
pub fn spawn_config_watcher(
    config_path: &Path,
    config: &Arc<ArcSwap<VoiceConfig>>,
    adjust: impl Fn(&mut VoiceConfig) + Send + 'static,
) -> Result<RecommendedWatcher> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();
    let file_name = path.file_name().map(ToOwned::to_owned);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        let touches_config = event
            .paths
            .iter()
            .any(|p| p.file_name().map(ToOwned::to_owned) == file_name);
        if touches_config {
            reload(&path, &config, &adjust);
        }
    })?;

    watcher.watch(&watch_dir(config_path), RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn watch_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_file(text: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), text).unwrap();
        file
    }

    #[test]
    fn valid_edit_is_stored_with_overrides() {
        let file = config_file("[thresholds]\npitch_low_hz = 80.0\n");
        let config = ArcSwap::from_pointee(VoiceConfig::default());

        assert!(reload(file.path(), &config, &|c: &mut VoiceConfig| {
            c.capture.duration_secs = 2.0;
        }));
        let snapshot = config.load();
        assert!((snapshot.thresholds.pitch_low_hz - 80.0).abs() < f32::EPSILON);
        assert!((snapshot.capture.duration_secs - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn broken_edit_keeps_previous() {
        let file = config_file("[thresholds\npitch_low_hz = ");
        let mut previous = VoiceConfig::default();
        previous.thresholds.rms_soft = 0.01;
        let config = ArcSwap::from_pointee(previous.clone());

        assert!(!reload(file.path(), &config, &|_: &mut VoiceConfig| {}));
        assert_eq!(**config.load(), previous);
    }

    #[test]
    fn inconsistent_thresholds_keep_previous() {
        let file = config_file("[thresholds]\nrms_soft = 0.5\nrms_loud = 0.1\n");
        let config = ArcSwap::from_pointee(VoiceConfig::default());
        assert!(!reload(file.path(), &config, &|_: &mut VoiceConfig| {}));
        assert_eq!(**config.load(), VoiceConfig::default());
    }

    #[test]
    fn watcher_starts_on_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.toml");
        std::fs::write(&path, "[capture]\nduration_secs = 2.0\n").unwrap();
        let config = Arc::new(ArcSwap::from_pointee(VoiceConfig::default()));
        let overrides = |c: &mut VoiceConfig| c.capture.sample_rate = 16000;
        assert!(spawn_config_watcher(&path, &config, overrides).is_ok());
    }

    #[test]
    fn bare_file_name_watches_cwd() {
        assert_eq!(watch_dir(Path::new("voice.toml")), PathBuf::from("."));
        assert_eq!(watch_dir(Path::new("config/default.toml")), PathBuf::from("config"));
    }
}
