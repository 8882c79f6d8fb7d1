use live_classifier::config::Config;
use live_classifier::device_display::impl_console::DeviceDisplayConsole;
use live_classifier::device_display::impl_gui::DeviceDisplayGui;
use live_classifier::frame_source::impl_fake::FrameSourceProviderFake;
use live_classifier::frame_source::impl_image_file::FrameSourceProviderImageFile;
use live_classifier::frame_source::interface::FrameSourceProvider;
use live_classifier::image_classifier;
use live_classifier::image_classifier::interface::ClassifierLoader;
use live_classifier::library::logger::impl_console::LoggerConsole;
use live_classifier::library::logger::interface::Logger;
use live_classifier::live_loop::main::LiveClassificationLoop;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "tract")]
fn classifier_loader(
    _config: &Config,
    logger: Arc<dyn Logger + Send + Sync>,
) -> Arc<dyn ClassifierLoader> {
    Arc::new(image_classifier::impl_tract_onnx::ClassifierLoaderTractOnnx::new(logger))
}

#[cfg(not(feature = "tract"))]
fn classifier_loader(
    config: &Config,
    logger: Arc<dyn Logger + Send + Sync>,
) -> Arc<dyn ClassifierLoader> {
    // without an inference backend, take the labels from the metadata when it exists
    let labels = image_classifier::metadata::ClassMetadata::from_path(&config.metadata_path)
        .map(|metadata| metadata.labels)
        .unwrap_or_else(|_| vec!["cat".to_string(), "dog".to_string(), "none".to_string()]);
    Arc::new(image_classifier::impl_fake::ClassifierLoaderFake::new(
        labels, logger,
    ))
}

fn frame_source_provider(
    config: &Config,
    logger: Arc<dyn Logger + Send + Sync>,
) -> Arc<dyn FrameSourceProvider> {
    if Path::new(&config.frame_image_path).exists() {
        Arc::new(FrameSourceProviderImageFile::new(
            &config.frame_image_path,
            logger,
        ))
    } else {
        Arc::new(FrameSourceProviderFake::new(logger))
    }
}

/// Renders to stdout and runs until Enter is pressed.
fn run_console(
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let live_loop = LiveClassificationLoop::new(
        config.clone(),
        logger.clone(),
        classifier_loader(&config, logger.clone()),
        frame_source_provider(&config, logger.clone()),
        Arc::new(DeviceDisplayConsole::new()),
    );

    live_loop.start()?;

    logger.info("Running, press Enter to stop")?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    live_loop.stop()?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::default();

    let logger: Arc<dyn Logger + Send + Sync> = Arc::new(LoggerConsole::new(config.logger_timezone));

    if config.headless {
        return run_console(config, logger);
    }

    let device_display = Arc::new(DeviceDisplayGui::new());

    let live_loop = Arc::new(LiveClassificationLoop::new(
        config.clone(),
        logger.clone(),
        classifier_loader(&config, logger.clone()),
        frame_source_provider(&config, logger.clone()),
        device_display.clone(),
    ));

    device_display.run(live_loop)?;

    logger.info("Window closed, shutting down")?;

    Ok(())
}
