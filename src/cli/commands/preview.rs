use super::{changepacks_cli, process_executor, Command};
use crate::changepacks::{render_body, ChangepackResultMap};
use crate::config::ActionConfig;
use crate::external::changepacks::VersioningTool;
use anyhow::{Context, Result};

pub struct PreviewCommand {
    config: ActionConfig,
    json: bool,
}

impl PreviewCommand {
    pub fn new(config: ActionConfig) -> Self {
        Self { config, json: false }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn render(&self, results: &ChangepackResultMap) -> Result<String> {
        if self.json {
            Ok(serde_json::to_string_pretty(results)?)
        } else {
            Ok(render_body(results))
        }
    }
}

impl Command for PreviewCommand {
    async fn execute(&self) -> Result<()> {
        let tool = changepacks_cli(&self.config, process_executor(&self.config));
        let results = tool.check().await.context("changepacks check failed")?;

        for (path, result) in &results {
            if result.is_missing_logs() {
                eprintln!("⚠️  {path} changed without a changelog entry");
            }
        }

        println!("{}", self.render(&results)?.trim_end());
        Ok(())
    }
}
