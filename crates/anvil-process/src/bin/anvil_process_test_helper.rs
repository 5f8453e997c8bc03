//! Fake external tool used by the integration tests.

use std::{
    env,
    io::{self, Write},
    process, thread,
    time::Duration,
};

fn value<T: std::str::FromStr>(value: Option<String>, flag: &str) -> T {
    let Some(value) = value else {
        eprintln!("missing value for {flag}");
        process::exit(2);
    };
    value.parse().unwrap_or_else(|_| {
        eprintln!("invalid value for {flag}: {value}");
        process::exit(2);
    })
}

fn main() -> io::Result<()> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdout-bytes" => {
                let bytes: usize = value(args.next(), &arg);
                io::stdout().lock().write_all(&vec![b'a'; bytes])?;
            }
            "--stderr" => {
                let text: String = value(args.next(), &arg);
                writeln!(io::stderr().lock(), "{text}")?;
            }
            "--exit" => {
                let code: i32 = value(args.next(), &arg);
                process::exit(code);
            }
            "--sleep-ms" => {
                let ms: u64 = value(args.next(), &arg);
                thread::sleep(Duration::from_millis(ms));
            }
            "--spawn-child-sleep-ms" => {
                let ms: u64 = value(args.next(), &arg);
                process::Command::new(env::current_exe()?)
                    .args(["--sleep-ms", &ms.to_string()])
                    .spawn()?;
            }
            other => {
                eprintln!("unknown argument: {other}");
                process::exit(2);
            }
        }
    }
    Ok(())
}
