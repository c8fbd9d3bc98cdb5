use anyhow::Context;

fn main() -> anyhow::Result<()> {
    storeops_observability::init();

    let mut args = std::env::args().skip(1);
    let fixture_path = args
        .next()
        .context("usage: storeops-access <fixture.json> [path...]")?;
    let paths: Vec<String> = args.collect();

    let raw = std::fs::read_to_string(&fixture_path)
        .with_context(|| format!("failed to read fixture {fixture_path}"))?;
    let fixture: storeops_access::Fixture =
        serde_json::from_str(&raw).context("fixture is not valid JSON")?;

    let report = storeops_access::inspect(fixture, &paths)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
