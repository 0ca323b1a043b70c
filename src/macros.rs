//! Macros shared by the routines in this crate.

/// Join path components with `/`, producing a `String`. Components that already end in `/` are
/// not given a second one.
///
/// ```ignore
/// dir!(REMOTE_WORK_DIR, "output", "main.p4") // "temp/output/main.p4"
/// ```
#[macro_export]
macro_rules! dir {
    ($first:expr $(, $part:expr)* $(,)?) => {{
        let mut path = String::from($first);
        $(
            if !path.ends_with('/') {
                path.push('/');
            }
            path.push_str(&$part);
        )*
        path
    }};
}

/// Time the given expression, push `(label, duration)` onto `timers`, and evaluate to the value of
/// the expression.
#[macro_export]
macro_rules! time {
    ($timers:ident, $label:expr, $expr:expr) => {{
        let start = std::time::Instant::now();
        let result = $expr;
        $timers.push(($label, start.elapsed()));
        result
    }};
}

/// Run a sequence of commands on a shell, optionally all in the same directory. Returns early
/// with the error if any command fails.
#[macro_export]
macro_rules! with_shell {
    ($shell:ident in $cwd:expr => $($cmd:expr),+ $(,)?) => {{
        $( $shell.run($cmd.cwd($cwd))?; )+
    }};
    ($shell:ident => $($cmd:expr),+ $(,)?) => {{
        $( $shell.run($cmd)?; )+
    }};
}
