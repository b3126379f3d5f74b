/// Command scripts replayed against an integer history buffer.
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use sketch_history::HistoryBuffer;

/// One step of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Append a layer.
    Push(i64),
    Undo,
    Redo,
    /// Print the sum of the valid layers.
    Reduce,
    /// Print the most recent valid layer.
    Last,
    /// Print the latest valid checkpoint.
    Checkpoint,
    /// Print cursor counts and the undo flag.
    Status,
    /// Print the encoded size of a snapshot of the valid layers.
    Snapshot,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let command = match name {
            "push" => {
                let value = parts
                    .next()
                    .ok_or_else(|| anyhow!("push expects a value"))?;
                let value = value
                    .parse::<i64>()
                    .with_context(|| format!("invalid push value '{value}'"))?;
                Command::Push(value)
            }
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "reduce" => Command::Reduce,
            "last" => Command::Last,
            "checkpoint" => Command::Checkpoint,
            "status" => Command::Status,
            "snapshot" => Command::Snapshot,
            other => bail!("unknown command '{other}'"),
        };
        if let Some(extra) = parts.next() {
            bail!("unexpected argument '{extra}' after '{name}'");
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Push(value) => write!(f, "push {value}"),
            Command::Undo => f.write_str("undo"),
            Command::Redo => f.write_str("redo"),
            Command::Reduce => f.write_str("reduce"),
            Command::Last => f.write_str("last"),
            Command::Checkpoint => f.write_str("checkpoint"),
            Command::Status => f.write_str("status"),
            Command::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// Parses a script: one command per line, `#` starts a comment.
///
/// # Errors
///
/// Returns an error naming the 1-based line of the first invalid command.
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let command = line
            .parse::<Command>()
            .with_context(|| format!("line {}: '{line}'", index + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

/// Parses commands given as separate arguments, e.g. `"push 3" undo`.
///
/// A bare number following `push` is accepted as its value, so
/// `push 3 undo` also works when the shell splits words.
///
/// # Errors
///
/// Returns an error naming the 1-based argument position of the first
/// invalid command.
pub fn parse_args(args: &[String]) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    let mut iter = args.iter().enumerate().peekable();
    while let Some((index, arg)) = iter.next() {
        let mut text = arg.trim().to_string();
        if text == "push" {
            if let Some((_, value)) = iter.next_if(|(_, next)| next.parse::<i64>().is_ok()) {
                text = format!("push {value}");
            }
        }
        let command = text
            .parse::<Command>()
            .with_context(|| format!("argument {}: '{arg}'", index + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

/// Combiner for integer layers. Sums wrap on overflow instead of panicking.
pub fn sum_layers(acc: &mut i64, next: &i64) {
    *acc = acc.wrapping_add(*next);
}

/// Applies `command` to `buffer` and returns the line to print.
///
/// # Errors
///
/// Returns an error only if a snapshot fails to encode.
pub fn execute(buffer: &mut HistoryBuffer<i64>, command: Command) -> Result<String> {
    let output = match command {
        Command::Push(value) => {
            let stored = *buffer.append(value);
            stored.to_string()
        }
        Command::Undo => buffer.undo().to_string(),
        Command::Redo => buffer.redo().to_string(),
        Command::Reduce => {
            let mut sum = 0;
            buffer.reduce_into(&mut sum);
            sum.to_string()
        }
        Command::Last => {
            if buffer.is_empty() {
                String::from("none")
            } else {
                buffer.last().to_string()
            }
        }
        Command::Checkpoint => buffer
            .last_checkpoint()
            .map_or_else(|| String::from("none"), ToString::to_string),
        Command::Status => format!(
            "layers={} stored={} checkpoints={} in_undo={}",
            buffer.len(),
            buffer.physical_len(),
            buffer.checkpoint_count(),
            buffer.in_undo()
        ),
        Command::Snapshot => {
            let bytes = buffer.snapshot().to_bytes()?;
            format!("{} layers, {} bytes", buffer.len(), bytes.len())
        }
    };
    Ok(format!("{command} -> {output}"))
}

/// Runs every command in order, collecting one output line per command.
///
/// # Errors
///
/// Returns the first execution error, tagged with the command's position.
pub fn run(buffer: &mut HistoryBuffer<i64>, commands: &[Command]) -> Result<Vec<String>> {
    commands
        .iter()
        .enumerate()
        .map(|(index, command)| {
            execute(buffer, *command).with_context(|| format!("command {}: {command}", index + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch_history::HistoryConfig;

    fn buffer(gap: usize) -> HistoryBuffer<i64> {
        HistoryBuffer::with_config(HistoryConfig::with_gap(gap), sum_layers)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("push -4".parse::<Command>().unwrap(), Command::Push(-4));
        assert_eq!("  undo ".parse::<Command>().unwrap(), Command::Undo);
        assert_eq!("checkpoint".parse::<Command>().unwrap(), Command::Checkpoint);
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        assert!("push".parse::<Command>().is_err());
        assert!("push x".parse::<Command>().is_err());
        assert!("undo 2".parse::<Command>().is_err());
        assert!("paint".parse::<Command>().is_err());
    }

    #[test]
    fn test_display_matches_parse() {
        for command in [Command::Push(12), Command::Redo, Command::Snapshot] {
            assert_eq!(command.to_string().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn test_parse_script_skips_comments_and_blanks() {
        let script = "# header\npush 1\n\n  push 2 # second\nundo\n";
        let commands = parse_script(script).unwrap();
        assert_eq!(
            commands,
            vec![Command::Push(1), Command::Push(2), Command::Undo]
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("push 1\nfrobnicate\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_args_joins_split_push() {
        let args: Vec<String> = ["push", "3", "push 4", "undo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let commands = parse_args(&args).unwrap();
        assert_eq!(
            commands,
            vec![Command::Push(3), Command::Push(4), Command::Undo]
        );
    }

    #[test]
    fn test_parse_args_reports_position() {
        let args = vec!["undo".to_string(), "push".to_string()];
        let err = parse_args(&args).unwrap_err();
        assert!(err.to_string().contains("argument 2"));
    }

    #[test]
    fn test_run_reference_session() {
        let mut buf = buffer(3);
        let mut commands: Vec<Command> = (1..=10).map(Command::Push).collect();
        commands.extend([
            Command::Reduce,
            Command::Checkpoint,
            Command::Undo,
            Command::Undo,
            Command::Checkpoint,
            Command::Redo,
            Command::Redo,
            Command::Status,
        ]);
        let lines = run(&mut buf, &commands).unwrap();
        assert_eq!(lines[9], "push 10 -> 10");
        assert_eq!(
            &lines[10..],
            &[
                "reduce -> 55",
                "checkpoint -> 45",
                "undo -> true",
                "undo -> true",
                "checkpoint -> 21",
                "redo -> true",
                "redo -> false",
                "status -> layers=10 stored=10 checkpoints=3 in_undo=false",
            ]
        );
    }

    #[test]
    fn test_last_and_checkpoint_on_empty_buffer() {
        let mut buf = buffer(3);
        assert_eq!(execute(&mut buf, Command::Last).unwrap(), "last -> none");
        assert_eq!(
            execute(&mut buf, Command::Checkpoint).unwrap(),
            "checkpoint -> none"
        );
        assert_eq!(execute(&mut buf, Command::Undo).unwrap(), "undo -> false");
    }

    #[test]
    fn test_snapshot_reports_valid_layers() {
        let mut buf = buffer(2);
        for value in 1..=4 {
            buf.append(value);
        }
        buf.undo();
        let line = execute(&mut buf, Command::Snapshot).unwrap();
        assert!(line.starts_with("snapshot -> 3 layers"));
    }

    #[test]
    fn test_sums_wrap_instead_of_overflowing() {
        let mut buf = buffer(2);
        let args = vec![
            "push".to_string(),
            i64::MAX.to_string(),
            "push 1".to_string(),
            "reduce".to_string(),
            "checkpoint".to_string(),
        ];
        let commands = parse_args(&args).unwrap();
        let lines = run(&mut buf, &commands).unwrap();
        assert_eq!(lines[1], "push 1 -> 1");
        assert_eq!(lines[2], format!("reduce -> {}", i64::MIN));
        assert_eq!(lines[3], format!("checkpoint -> {}", i64::MIN));
    }
}
