//! Asset boundary: модели и длительности анимационных клипов
//!
//! Загрузка асинхронная и живёт у хоста (`AssetLoader`). Симуляция только
//! опрашивает loader и кеширует результат по URL. Entity с недогруженной
//! моделью создаётся неактивной.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("failed to load {url}: {reason}")]
    LoadFailed { url: String, reason: String },
}

/// Непрозрачный handle модели (выдаётся кешем)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u32);

/// То, что симуляции нужно от модели: handle + длительности клипов
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelAsset {
    /// Длительность клипа в секундах по имени ("attacking", "hit", "death", ...)
    pub clips: HashMap<String, f32>,
}

impl ModelAsset {
    pub fn with_clip(mut self, name: impl Into<String>, duration: f32) -> Self {
        self.clips.insert(name.into(), duration);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    Ready(ModelAsset),
    Failed(AssetError),
}

/// Host-side загрузчик (glTF и т.п.)
pub trait AssetLoader {
    /// Запросить/опросить загрузку. Повторный вызов для того же URL допустим.
    fn poll(&mut self, url: &str) -> LoadState;
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Ready(ModelHandle, ModelAsset),
    Failed(AssetError),
}

/// Кеш моделей по URL
#[derive(Debug, Default)]
pub struct AssetCache {
    slots: HashMap<String, Slot>,
    next_handle: u32,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Опросить URL. Ready/Failed результаты кешируются, loader больше не дёргается.
    pub fn request(&mut self, url: &str, loader: &mut dyn AssetLoader) -> Result<Option<(ModelHandle, ModelAsset)>, AssetError> {
        match self.slots.get(url) {
            Some(Slot::Ready(handle, asset)) => return Ok(Some((*handle, asset.clone()))),
            Some(Slot::Failed(error)) => return Err(error.clone()),
            Some(Slot::Pending) | None => {}
        }

        match loader.poll(url) {
            LoadState::Pending => {
                self.slots.insert(url.to_string(), Slot::Pending);
                Ok(None)
            }
            LoadState::Ready(asset) => {
                let handle = ModelHandle(self.next_handle);
                self.next_handle += 1;
                self.slots.insert(url.to_string(), Slot::Ready(handle, asset.clone()));
                crate::logger::log_info(&format!("Model loaded: {} → {:?}", url, handle));
                Ok(Some((handle, asset)))
            }
            LoadState::Failed(error) => {
                crate::logger::log_error(&format!("Model load failed: {}", error));
                self.slots.insert(url.to_string(), Slot::Failed(error.clone()));
                Err(error)
            }
        }
    }

    /// Только кеш, без обращения к loader
    pub fn cached(&self, url: &str) -> Option<(ModelHandle, &ModelAsset)> {
        match self.slots.get(url) {
            Some(Slot::Ready(handle, asset)) => Some((*handle, asset)),
            _ => None,
        }
    }

    pub fn is_pending(&self, url: &str) -> bool {
        matches!(self.slots.get(url), Some(Slot::Pending))
    }
}

/// Loader для headless режима: всё готово сразу, клипы из таблицы
#[derive(Debug, Clone, Default)]
pub struct InstantLoader {
    pub models: HashMap<String, ModelAsset>,
    /// Сколько раз poll был вызван (кеш должен держать это число низким)
    pub polls: usize,
}

impl InstantLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, url: impl Into<String>, asset: ModelAsset) -> Self {
        self.models.insert(url.into(), asset);
        self
    }
}

impl AssetLoader for InstantLoader {
    fn poll(&mut self, url: &str) -> LoadState {
        self.polls += 1;
        match self.models.get(url) {
            Some(asset) => LoadState::Ready(asset.clone()),
            None => LoadState::Failed(AssetError::NotFound(url.to_string())),
        }
    }
}
