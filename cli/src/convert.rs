use anyhow::Result;

use abstutil::Timer;
use convert_osm::ConversionConfig;

pub fn run(
    input: String,
    config: ConversionConfig,
    output: String,
    report_path: Option<String>,
) -> Result<()> {
    let mut timer = Timer::new(&format!("convert {}", input));
    let graph = raw_map::load_extract(&input, &mut timer)?;
    let (network, report) = convert_osm::convert(graph, &config, &mut timer)?;

    // Still write the network, so the problem can be inspected
    if let Err(err) = network.validate(config.signal_timings.intergreen()) {
        error!("The converted network is inconsistent: {}", err);
    }

    abstutil::write_json(&output, &network)?;
    if let Some(path) = report_path {
        abstutil::write_json(&path, &report)?;
    }
    Ok(())
}
