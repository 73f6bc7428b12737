//! milestone init command

use clap::Args;
use console::style;
use dialoguer::Confirm;
use std::fs;
use std::path::{Path, PathBuf};

const EXAMPLE_CONFIG: &str = r#"debug: false
database:
  type: sqlite
  file: milestone.db
  host: localhost
  port: 3306
  database: minecraft
  username: root
  password: ""
  ssl: false
  pool-size: 10
advancement:
  mode: HYBRID
  block-namespaces: []
  block-ids: []
leaderboard:
  refresh-interval-secs: 300
  initial-delay-secs: 1
  cache-size: 100
milestones-dir: milestones
"#;

const EXAMPLE_CORE: &str = r#"milestones:
  first_login:
    type: ONE_TIME
    icon: oak_sapling
    title: First Steps
    description:
      - Join the server for the first time
    trigger:
      type: JOIN
  collector:
    type: HIDDEN
    parent: first_login
    icon: chest
    title: Collector
    visible: false
    announce_to_chat: false
"#;

const EXAMPLE_MINING: &str = r#"milestones:
  stone_breaker:
    type: COUNTER
    max: 64
    icon: stone_pickaxe
    title: Stone Breaker
    description:
      - Break 64 stone
    trigger:
      type: BLOCK_BREAK
      value: stone
  diamond:
    type: ONE_TIME
    parent: stone_breaker
    icon: diamond
    title: Diamonds!
    trigger:
      type: BLOCK_BREAK
      value: diamond_ore
"#;

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Directory to initialize
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Overwrite existing files without asking
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        self.run_with(|existing| {
            Ok(Confirm::new()
                .with_prompt(format!("{} already exists. Overwrite?", existing.display()))
                .default(false)
                .interact()?)
        })
    }

    /// Scaffold the directory, asking `confirm` before replacing any file
    /// unless `--force` is set
    pub fn run_with<F>(&self, mut confirm: F) -> anyhow::Result<()>
    where
        F: FnMut(&Path) -> anyhow::Result<bool>,
    {
        println!("Initializing milestone data in {}", self.directory.display());

        let milestones_dir = self.directory.join("milestones");
        let files = [
            (self.directory.join("config.yml"), EXAMPLE_CONFIG),
            (milestones_dir.join("core.yml"), EXAMPLE_CORE),
            (milestones_dir.join("mining").join("mining.yml"), EXAMPLE_MINING),
        ];

        let mut written = 0;
        for (path, content) in &files {
            if path.exists() && !self.force && !confirm(path)? {
                println!("  {} {}", style("skipped").yellow(), path.display());
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
            println!("  {} {}", style("wrote").green(), path.display());
            written += 1;
        }

        println!("{} Milestone data initialized ({} files)", style("✓").green(), written);
        Ok(())
    }
}
