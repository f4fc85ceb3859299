use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use toml::{Table, Value};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=config.toml");
    println!("cargo:rerun-if-env-changed=VERBOSE_BUILD");

    let out_dir = env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    // Config parsing
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let root: Table = if !config_str.is_empty() {
        toml::from_str(&config_str).unwrap_or_else(|e| {
            println!("cargo:warning=Failed to parse config.toml: {}", e);
            Table::new()
        })
    } else {
        Table::new()
    };

    let empty = Table::new();
    let timer = table(&root, "timer").unwrap_or(&empty);
    let log = table(&root, "log").unwrap_or(&empty);

    let hz = integer(timer, "hz", 100);
    let clock_hz = integer(timer, "clock_hz", 1_000_000);
    let kernel_timers = integer(timer, "kernel_timers", 20);
    let channel = integer(timer, "channel", 3);
    let base = integer(timer, "base", 0x3F00_3000);
    let buffer_size = integer(log, "buffer_size", 4096);

    if hz == 0 || hz > u32::MAX as i64 {
        panic!("timer.hz must be in 1..=u32::MAX, got {}", hz);
    }
    if clock_hz < hz || clock_hz > u32::MAX as i64 {
        panic!("timer.clock_hz must be in hz..=u32::MAX, got {}", clock_hz);
    }
    if clock_hz % hz != 0 {
        println!(
            "cargo:warning=timer.clock_hz ({}) is not a multiple of timer.hz ({}), ticks will run fast",
            clock_hz, hz
        );
    }
    if kernel_timers <= 0 || kernel_timers > u32::MAX as i64 {
        panic!("timer.kernel_timers must be positive, got {}", kernel_timers);
    }
    if !(0..=3).contains(&channel) {
        panic!("timer.channel must be 0..=3, got {}", channel);
    }
    if base < 0 {
        panic!("timer.base must be a physical address, got {}", base);
    }
    if buffer_size <= 0 {
        panic!("log.buffer_size must be positive, got {}", buffer_size);
    }

    let level = if env::var_os("VERBOSE_BUILD").is_some() {
        "trace".to_string()
    } else {
        log.get("level")
            .and_then(Value::as_str)
            .unwrap_or("debug")
            .to_ascii_lowercase()
    };
    let level_filter = match level.as_str() {
        "off" => "Off",
        "error" => "Error",
        "warn" => "Warn",
        "info" => "Info",
        "debug" => "Debug",
        "trace" => "Trace",
        other => panic!("log.level: unknown level {:?}", other),
    };

    let mut generated = String::new();
    writeln!(generated, "/// Ticks per second.").unwrap();
    writeln!(generated, "pub const HZ: u32 = {};", hz).unwrap();
    writeln!(generated, "/// Frequency of the free-running counter.").unwrap();
    writeln!(generated, "pub const CLOCK_HZ: u32 = {};", clock_hz).unwrap();
    writeln!(generated, "/// Capacity of the kernel timer table.").unwrap();
    writeln!(generated, "pub const KERNEL_TIMERS: usize = {};", kernel_timers).unwrap();
    writeln!(generated, "/// Compare channel owned by the tick interrupt.").unwrap();
    writeln!(generated, "pub const TIMER_CHANNEL: u8 = {};", channel).unwrap();
    writeln!(generated, "/// Base address of the system timer registers.").unwrap();
    writeln!(generated, "pub const SYSTIMER_BASE: usize = {:#x};", base).unwrap();
    writeln!(generated, "/// Maximum level recorded by the kernel logger.").unwrap();
    writeln!(
        generated,
        "pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::{};",
        level_filter
    )
    .unwrap();
    writeln!(generated, "/// Size of the log ring buffer in bytes.").unwrap();
    writeln!(generated, "pub const LOG_BUFFER_SIZE: usize = {};", buffer_size).unwrap();

    fs::write(out_path.join("config.rs"), generated).unwrap();
}

fn table<'a>(root: &'a Table, key: &str) -> Option<&'a Table> {
    root.get(key).and_then(Value::as_table)
}

fn integer(table: &Table, key: &str, default: i64) -> i64 {
    match table.get(key) {
        Some(value) => value
            .as_integer()
            .unwrap_or_else(|| panic!("config key {:?} must be an integer", key)),
        None => default,
    }
}
