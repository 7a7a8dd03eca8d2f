use sheetcat_core::error::SheetcatError;
use sheetcat_core::model::Role;
use sheetcat_core::rules::{builtin, load_rules, Rules};
use std::path::Path;

pub fn show() -> Result<(), SheetcatError> {
    let rules = builtin::load_builtin()?;
    print_summary(&rules);
    Ok(())
}

pub fn dump() -> Result<(), SheetcatError> {
    print!("{}", builtin::builtin_json());
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), SheetcatError> {
    let rules = load_rules(file)?;
    let table = rules.table();
    println!("Rule table '{}' (v{}) is valid.", table.name, table.version);

    // Missing roles are allowed but weaken inference.
    let missing: Vec<String> = Role::PRIORITY
        .iter()
        .filter(|role| table.role_keywords.get(*role).map_or(true, |k| k.is_empty()))
        .map(|role| role.to_string())
        .collect();
    let mut warnings = Vec::new();
    if !missing.is_empty() {
        warnings.push(format!(
            "no header keywords for: {} (these columns are found by shape only)",
            missing.join(", ")
        ));
    }
    if table.total_prefixes.is_empty() {
        warnings.push("no total prefixes; subtotal lines are only caught by structural words".into());
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {w}");
        }
    }

    Ok(())
}

fn print_summary(rules: &Rules) {
    let table = rules.table();
    println!("{} (version {})\n", table.name, table.version);
    if let Some(ref desc) = table.description {
        println!("{desc}\n");
    }

    println!("Header keywords by role (highest priority first):\n");
    for role in Role::PRIORITY {
        let keywords = table
            .role_keywords
            .get(&role)
            .map(|k| k.join(", "))
            .unwrap_or_else(|| "-".into());
        println!("  {:<13} {}", role.to_string(), keywords);
    }

    println!("\nStructural words: {}", table.structural_keywords.join(", "));
    println!("Total prefixes:   {}", table.total_prefixes.join(", "));

    println!("\nMaterials:\n");
    for material in &table.materials {
        println!("  {:<13} {}", material.label, material.keywords.join(", "));
    }

    let fallbacks = &table.positional_fallbacks;
    println!(
        "\nPositional fallbacks: name -> columns {:?}, code -> columns {:?}",
        fallbacks.name, fallbacks.code
    );
}
