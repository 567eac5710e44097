use std::path::PathBuf;

use clap::Parser;
use vs_core::config::VoiceConfig;

/// voicescope — Coach vocal en temps quasi réel.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Analyser un fichier audio (WAV, MP3, FLAC, OGG) au lieu du micro.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Sortie texte ligne par ligne au lieu du TUI.
    #[arg(long, default_value_t = false, conflicts_with = "json")]
    pub plain: bool,

    /// Un objet JSON par cycle sur stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// S'arrêter après N cycles.
    #[arg(short = 'n', long)]
    pub cycles: Option<u64>,

    /// Durée de chaque enregistrement, en secondes.
    #[arg(short, long)]
    pub duration: Option<f32>,

    /// Fréquence d'échantillonnage demandée au périphérique, Hz.
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// How cycle results are shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Tui,
    Plain,
    Json,
}

/// Capture settings given on the command line.
///
/// Applied on startup and after every hot reload, so the flags keep
/// precedence over the file.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CaptureOverrides {
    pub duration_secs: Option<f32>,
    pub sample_rate: Option<u32>,
}

impl CaptureOverrides {
    /// Overwrite the capture section, then re-clamp.
    pub fn apply(self, config: &mut VoiceConfig) {
        if let Some(duration) = self.duration_secs {
            config.capture.duration_secs = duration;
        }
        if let Some(rate) = self.sample_rate {
            config.capture.sample_rate = rate;
        }
        config.clamp_all();
    }
}

impl Cli {
    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.plain {
            OutputMode::Plain
        } else {
            OutputMode::Tui
        }
    }

    #[must_use]
    pub fn overrides(&self) -> CaptureOverrides {
        CaptureOverrides {
            duration_secs: self.duration,
            sample_rate: self.sample_rate,
        }
    }

    /// Label shown in the status bar and logs: "micro" or the file name.
    #[must_use]
    pub fn source_label(&self) -> String {
        match &self.file {
            Some(path) => path
                .file_name()
                .map_or_else(
                    || path.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                ),
            None => "micro".to_owned(),
        }
    }
}
