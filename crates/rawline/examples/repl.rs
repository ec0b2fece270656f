//! Minimal REPL driving the blocking API.
//!
//! Run with `--multi` for wrapped rendering or `--mask` for password-style
//! input. Lines starting with "first" or "second" tab-complete.

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use rawline::{Completions, Hint, Mode, Session, Status};

    let mut mode = Mode::empty();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--multi" => mode |= Mode::MULTI_LINE,
            "--mask" => mode |= Mode::MASKED,
            other => {
                eprintln!("unknown option: {other}");
                std::process::exit(2);
            }
        }
    }

    let mut session = Session::from_stdio(100)?;
    session.set_mode(mode);
    session.set_completion_source(|line: &str, out: &mut Completions| {
        for word in ["first", "firstish", "second", "secondish"] {
            if !line.is_empty() && word.starts_with(line) {
                out.add(word);
            }
        }
    });
    session.set_hint_source(|line: &str| {
        line.eq("first").then(|| Hint {
            text: " <args>".to_owned(),
            color: Some(35),
            bold: false,
        })
    });

    loop {
        match session.read_line("> ")? {
            Status::Submitted => {
                let line = session.text().into_owned();
                println!("echo: {line}");
                session.history_add(&line);
            }
            Status::Interrupted | Status::Ended => break,
            Status::Editing => unreachable!("read_line never returns Editing"),
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("this example requires a Unix terminal");
}
