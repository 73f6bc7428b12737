//! milestone check command

use clap::Args;
use console::style;

use advancement::resolver::{cyclic, orphans, sort_topologically};
use shared::Milestone;

use super::Context;

/// What registration would do with the loaded definitions
#[derive(Debug)]
pub struct RegistrationPlan {
    /// Parent-first registration order
    pub order: Vec<Milestone>,
    /// Milestones whose parent is not loaded; they register as roots
    pub orphans: Vec<Milestone>,
    /// Milestones on a parent cycle
    pub cyclic: Vec<Milestone>,
}

impl RegistrationPlan {
    pub fn from_definitions(milestones: &[Milestone]) -> Self {
        Self {
            order: sort_topologically(milestones).into_iter().cloned().collect(),
            orphans: orphans(milestones).into_iter().cloned().collect(),
            cyclic: cyclic(milestones).into_iter().cloned().collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.cyclic.is_empty()
    }
}

#[derive(Debug, Args)]
pub struct CheckCommand {}

impl CheckCommand {
    pub fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let plan = self.plan(ctx)?;
        print_plan(&plan);
        Ok(())
    }

    pub fn plan(&self, ctx: &Context) -> anyhow::Result<RegistrationPlan> {
        let settings = ctx.settings()?;
        let milestones = ctx.definitions(&settings)?;
        Ok(RegistrationPlan::from_definitions(&milestones))
    }
}

fn print_plan(plan: &RegistrationPlan) {
    println!("{} ({} milestones)", style("Registration plan").bold(), plan.order.len());
    for (i, milestone) in plan.order.iter().enumerate() {
        let parent = milestone
            .parent
            .as_ref()
            .map(|p| format!(" <- {}", p))
            .unwrap_or_default();
        println!(
            "  {:>3}. [{}] {}{}  {}",
            i + 1,
            milestone.kind.frame().as_str(),
            style(milestone.id.as_str()).cyan(),
            style(parent).dim(),
            milestone.display.title,
        );
    }

    if !plan.orphans.is_empty() {
        println!();
        println!("{}", style("Missing parents (registered as roots)").yellow().bold());
        for milestone in &plan.orphans {
            if let Some(parent) = &milestone.parent {
                println!("  ! {} -> {}", milestone.id, parent);
            }
        }
    }

    if !plan.cyclic.is_empty() {
        println!();
        println!("{}", style("Parent cycles").red().bold());
        for milestone in &plan.cyclic {
            println!("  ! {}", milestone.id);
        }
    }

    if plan.is_clean() {
        println!("{} No problems found", style("✓").green());
    }
}
