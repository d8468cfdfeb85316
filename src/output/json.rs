use crate::crawler::CrawlResult;
use crate::output::OutputResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serializes a crawl result as pretty-printed JSON
pub fn to_json_string(result: &CrawlResult) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Writes a crawl result to `output_path` as JSON
pub fn write_json(result: &CrawlResult, output_path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
