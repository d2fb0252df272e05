use crate::output::{print_json, print_table};
use anyhow::Context;
use ccenter_core::config::Config;
use ccenter_core::skill::SkillCatalog;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum SkillsSubcommand {
    /// List every skill definition
    List,
    /// Show the steps of one skill
    Show { name: String },
}

pub fn run(root: &Path, subcmd: SkillsSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let catalog = SkillCatalog::load_dir(&config.skills_path(root))
        .context("failed to load skill definitions")?;
    match subcmd {
        SkillsSubcommand::List => list(&catalog, json),
        SkillsSubcommand::Show { name } => show(&catalog, &name, json),
    }
}

fn list(catalog: &SkillCatalog, json: bool) -> anyhow::Result<()> {
    if json {
        let all: Vec<_> = catalog.iter().collect();
        return print_json(&all);
    }
    if catalog.is_empty() {
        println!("No skills defined.");
        return Ok(());
    }
    let rows = catalog
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.steps.len().to_string(),
                s.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["NAME", "STEPS", "DESCRIPTION"], rows);
    Ok(())
}

fn show(catalog: &SkillCatalog, name: &str, json: bool) -> anyhow::Result<()> {
    let skill = catalog.require(name)?;
    if json {
        return print_json(skill);
    }
    println!("{}", skill.name);
    if let Some(desc) = &skill.description {
        println!("{desc}");
    }
    let rows = skill
        .steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                i.to_string(),
                s.name.clone(),
                s.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!();
    print_table(&["#", "STEP", "DESCRIPTION"], rows);
    Ok(())
}
