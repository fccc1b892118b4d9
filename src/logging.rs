use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Nível de log a partir do número de `-v` na linha de comando.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logger do terminal, em stderr para não misturar com a saída JSON.
pub fn init(verbosity: u8) {
    let config = ConfigBuilder::new()
        .add_filter_allow_str("stream_scout")
        .set_time_level(LevelFilter::Debug)
        .build();
    if TermLogger::init(level_for(verbosity), config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("Logger já inicializado");
    }
}

/// Logger para testes. Vários testes podem chamar; só a primeira chamada vale.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
