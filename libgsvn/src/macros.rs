macro_rules! bug {
    ($($arg:tt)*) => {{
        eprintln!("BUG!");
        unreachable!($($arg)*)
    }};
}

// absolute path to the fixtures directory used by the codec/protocol tests
macro_rules! fixtures_dir {
    () => {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    };
    ($path:expr) => {
        fixtures_dir!().join($path)
    };
}
