use sheetcat_core::error::SheetcatError;
use sheetcat_core::model::CatalogExtraction;

pub fn print(catalog: &CatalogExtraction) -> Result<(), SheetcatError> {
    let json = serde_json::to_string_pretty(catalog)?;
    println!("{json}");
    Ok(())
}
