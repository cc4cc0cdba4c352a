use clap::ValueEnum;
use harwise_core::SampleOptions;
use harwise_core::export::ExportOptions;

pub mod commands;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Table,
}

/// Options shared by every command that reads a capture
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub no_template: bool,
    /// Replaces the default masked header list when set
    pub mask_headers: Option<Vec<String>>,
    pub base_url: Option<String>,
}

impl GlobalOptions {
    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            template: !self.no_template,
        }
    }

    pub fn export_options(&self, strict: bool) -> ExportOptions {
        let defaults = ExportOptions::default();
        ExportOptions {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            mask_headers: self
                .mask_headers
                .as_ref()
                .map(|headers| headers.iter().map(|h| h.trim().to_lowercase()).collect())
                .unwrap_or(defaults.mask_headers),
            strict,
        }
    }
}
