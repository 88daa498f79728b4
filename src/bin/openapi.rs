use anyhow::Result;

// Print the OpenAPI document generated from the router wiring.
fn main() -> Result<()> {
    let openapi = redrecon::api::openapi();
    println!("{}", openapi.to_pretty_json()?);
    Ok(())
}
