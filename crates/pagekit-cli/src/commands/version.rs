use pagekit_core::version::version_string;
use pagekit_core::VERSION;
use miette::Result;

pub fn run(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "name": "pagekit", "version": VERSION }));
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
