use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one run, written next to the audio files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub module_title: String,
    pub source_url: String,
    pub generated_at: DateTime<Utc>,
    pub voice: String,
    pub language: String,
    pub speed: f32,
    pub units: Vec<UnitRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UnitFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub file: String,
    pub chunks: usize,
    pub characters: usize,
    pub estimated_seconds: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    pub index: usize,
    pub title: String,
    pub error: String,
}

impl RunManifest {
    pub fn new(module_title: &str, source_url: &str, voice: &str, language: &str, speed: f32) -> Self {
        Self {
            module_title: module_title.to_string(),
            source_url: source_url.to_string(),
            generated_at: Utc::now(),
            voice: voice.to_string(),
            language: language.to_string(),
            speed,
            units: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.units.iter().map(|u| u.bytes).sum()
    }

    pub fn total_estimated_seconds(&self) -> u64 {
        self.units.iter().map(|u| u.estimated_seconds).sum()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write manifest {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, bytes: u64, secs: u64) -> UnitRecord {
        UnitRecord {
            index,
            url: format!("https://learn.microsoft.com/es-es/training/modules/m/{}-unit/", index),
            title: format!("Unidad {}", index),
            file: format!("unit_{}-unidad_{}.mp3", index, index),
            chunks: 1,
            characters: 300,
            estimated_seconds: secs,
            bytes,
        }
    }

    #[test]
    fn totals() {
        let mut manifest = RunManifest::new("Módulo", "https://learn.microsoft.com/m/", "online", "es", 1.0);
        manifest.units.push(record(1, 1000, 20));
        manifest.units.push(record(2, 500, 40));
        assert_eq!(manifest.total_bytes(), 1500);
        assert_eq!(manifest.total_estimated_seconds(), 60);
    }

    #[test]
    fn writes_pretty_json() {
        let dir = std::env::temp_dir().join(format!("narrator-manifest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("manifest.json");

        let mut manifest = RunManifest::new("Módulo", "https://learn.microsoft.com/m/", "offline", "es", 1.25);
        manifest.units.push(record(1, 1000, 20));
        manifest.write(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"module_title\": \"Módulo\""));
        assert!(!raw.contains("failures"));

        let back: RunManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.units.len(), 1);
        assert_eq!(back.units[0].file, "unit_1-unidad_1.mp3");
        assert_eq!(back.generated_at, manifest.generated_at);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failures_are_recorded() {
        let mut manifest = RunManifest::new("Módulo", "https://learn.microsoft.com/m/", "online", "es", 1.0);
        manifest.failures.push(UnitFailure {
            index: 3,
            title: "Comprobación".into(),
            error: "speech service returned HTTP 429".into(),
        });
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["failures"][0]["index"], 3);
        assert_eq!(json["voice"], "online");
    }
}
