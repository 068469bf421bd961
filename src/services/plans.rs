use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use crate::error::PlanError;

/// Nutrition plan categories, each backed by a directory of PDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanCategory {
    WeightLoss,
    WeightGain,
    Maintenance,
    Sports,
    Metabolic,
    Aesthetic,
}

impl PlanCategory {
    pub const ALL: [PlanCategory; 6] = [
        PlanCategory::WeightLoss,
        PlanCategory::WeightGain,
        PlanCategory::Maintenance,
        PlanCategory::Sports,
        PlanCategory::Metabolic,
        PlanCategory::Aesthetic,
    ];

    /// Directory name and callback suffix.
    pub fn slug(&self) -> &'static str {
        match self {
            PlanCategory::WeightLoss => "weight_loss",
            PlanCategory::WeightGain => "weight_gain",
            PlanCategory::Maintenance => "maintenance",
            PlanCategory::Sports => "sports",
            PlanCategory::Metabolic => "metabolic",
            PlanCategory::Aesthetic => "aesthetic",
        }
    }

    pub fn button_label(&self) -> &'static str {
        match self {
            PlanCategory::WeightLoss => "📉 Weight Loss",
            PlanCategory::WeightGain => "📈 Muscle Gain",
            PlanCategory::Maintenance => "⚖ Maintenance",
            PlanCategory::Sports => "🏃 Sports Performance",
            PlanCategory::Metabolic => "❤ Metabolic Health",
            PlanCategory::Aesthetic => "💪 Aesthetic Goals",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlanCategory::WeightLoss => "weight loss",
            PlanCategory::WeightGain => "muscle gain",
            PlanCategory::Maintenance => "maintenance",
            PlanCategory::Sports => "sports performance",
            PlanCategory::Metabolic => "metabolic health",
            PlanCategory::Aesthetic => "aesthetic goals",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.slug() == slug)
    }
}

/// Filesystem catalog of plan PDFs laid out as `<root>/<slug>/*.pdf`.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    root: PathBuf,
}

impl PlanCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: PlanCategory) -> PathBuf {
        self.root.join(category.slug())
    }

    /// PDF files for a category, sorted by file name. A missing directory is an empty category.
    pub async fn list(&self, category: PlanCategory) -> Result<Vec<PathBuf>, PlanError> {
        let dir = self.category_dir(category);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_pdf(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub async fn pick_random(&self, category: PlanCategory) -> Result<PathBuf, PlanError> {
        let files = self.list(category).await?;
        files
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| PlanError::NoPlansAvailable(category.slug().to_string()))
    }

    /// How many plans each category holds, for startup logging.
    pub async fn inventory(&self) -> Vec<(PlanCategory, usize)> {
        let mut inventory = Vec::with_capacity(PlanCategory::ALL.len());
        for category in PlanCategory::ALL {
            let count = match self.list(category).await {
                Ok(files) => files.len(),
                Err(e) => {
                    tracing::warn!("Failed to read plans for {}: {}", category.slug(), e);
                    0
                }
            };
            inventory.push((category, count));
        }
        inventory
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Free users get `limit` downloads per local day; premium users are unlimited.
pub fn check_download_allowed(is_premium: bool, downloads_today: i64, limit: i64) -> Result<(), PlanError> {
    if is_premium || downloads_today < limit {
        Ok(())
    } else {
        Err(PlanError::DailyLimitReached { limit })
    }
}

/// Downloads left today for a free user.
pub fn remaining_downloads(downloads_today: i64, limit: i64) -> i64 {
    (limit - downloads_today).max(0)
}
