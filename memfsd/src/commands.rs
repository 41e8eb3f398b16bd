//! # Script Commands
//!
//! A small command surface for driving the namespace service from a script.
//!
//! ## Command Set
//!
//! - `mkdir <path> [mode]` - Create a directory
//! - `touch <path> [mode]` - Create an empty file if missing
//! - `write <path> <text>` - Replace file contents
//! - `append <path> <text>` - Append to a file
//! - `cat <path>` - Print file contents
//! - `ls [path]` - List a directory
//! - `stat <path>` - Show node attributes
//! - `chmod <mode> <path>` - Change permission bits
//! - `truncate <path> <size>` - Resize a file
//! - `rm <path>` - Remove a file
//! - `rmdir <path>` - Remove an empty directory
//!
//! Modes are octal. Blank lines and lines starting with `#` are skipped.

use thiserror::Error;

/// Command parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Script commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCommand {
    Mkdir { path: String, mode: u32 },
    Touch { path: String, mode: u32 },
    Write { path: String, text: String },
    Append { path: String, text: String },
    Cat { path: String },
    Ls { path: String },
    Stat { path: String },
    Chmod { mode: u32, path: String },
    Truncate { path: String, size: u64 },
    Rm { path: String },
    Rmdir { path: String },
}

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Command parser
pub struct FsCommandParser;

impl FsCommandParser {
    /// Parses one line
    ///
    /// Returns `Ok(None)` for blank lines and comments.
    pub fn parse(line: &str) -> Result<Option<FsCommand>, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match cmd.to_lowercase().as_str() {
            "mkdir" => FsCommand::Mkdir {
                path: Self::arg(&args, 0, "path")?,
                mode: Self::mode(&args, 1, DEFAULT_DIR_MODE)?,
            },
            "touch" => FsCommand::Touch {
                path: Self::arg(&args, 0, "path")?,
                mode: Self::mode(&args, 1, DEFAULT_FILE_MODE)?,
            },
            "write" => {
                let (path, text) = Self::path_and_text(rest)?;
                FsCommand::Write { path, text }
            }
            "append" => {
                let (path, text) = Self::path_and_text(rest)?;
                FsCommand::Append { path, text }
            }
            "cat" => FsCommand::Cat {
                path: Self::arg(&args, 0, "path")?,
            },
            "ls" => FsCommand::Ls {
                path: args.first().map_or_else(|| "/".to_string(), |p| p.to_string()),
            },
            "stat" => FsCommand::Stat {
                path: Self::arg(&args, 0, "path")?,
            },
            "chmod" => FsCommand::Chmod {
                mode: Self::octal(&Self::arg(&args, 0, "mode")?)?,
                path: Self::arg(&args, 1, "path")?,
            },
            "truncate" => {
                let size = Self::arg(&args, 1, "size")?;
                FsCommand::Truncate {
                    path: Self::arg(&args, 0, "path")?,
                    size: size
                        .parse()
                        .map_err(|_| CommandError::InvalidNumber(size.clone()))?,
                }
            }
            "rm" => FsCommand::Rm {
                path: Self::arg(&args, 0, "path")?,
            },
            "rmdir" => FsCommand::Rmdir {
                path: Self::arg(&args, 0, "path")?,
            },
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }

    fn arg(args: &[&str], index: usize, name: &str) -> Result<String, CommandError> {
        args.get(index)
            .map(|arg| arg.to_string())
            .ok_or_else(|| CommandError::MissingArgument(name.to_string()))
    }

    fn mode(args: &[&str], index: usize, default: u32) -> Result<u32, CommandError> {
        match args.get(index) {
            Some(mode) => Self::octal(mode),
            None => Ok(default),
        }
    }

    fn octal(text: &str) -> Result<u32, CommandError> {
        u32::from_str_radix(text, 8).map_err(|_| CommandError::InvalidNumber(text.to_string()))
    }

    /// Splits `<path> <text...>`; the text keeps its inner spacing and may
    /// be wrapped in double quotes
    fn path_and_text(rest: &str) -> Result<(String, String), CommandError> {
        let (path, text) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| CommandError::MissingArgument("text".to_string()))?;
        let text = text.trim();
        let text = text
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(text);
        Ok((path.to_string(), text.replace("\\n", "\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mkdir_default_mode() {
        let cmd = FsCommandParser::parse("mkdir /etc").unwrap();
        assert_eq!(
            cmd,
            Some(FsCommand::Mkdir {
                path: "/etc".to_string(),
                mode: 0o755
            })
        );
    }

    #[test]
    fn test_parse_mkdir_with_mode() {
        let cmd = FsCommandParser::parse("mkdir /tmp 1777").unwrap();
        assert_eq!(
            cmd,
            Some(FsCommand::Mkdir {
                path: "/tmp".to_string(),
                mode: 0o1777
            })
        );
    }

    #[test]
    fn test_parse_write_keeps_spacing() {
        let cmd = FsCommandParser::parse("write /motd \"hello  panda\\n\"").unwrap();
        assert_eq!(
            cmd,
            Some(FsCommand::Write {
                path: "/motd".to_string(),
                text: "hello  panda\n".to_string()
            })
        );
    }

    #[test]
    fn test_parse_ls_defaults_to_root() {
        assert_eq!(
            FsCommandParser::parse("ls").unwrap(),
            Some(FsCommand::Ls {
                path: "/".to_string()
            })
        );
    }

    #[test]
    fn test_parse_chmod() {
        assert_eq!(
            FsCommandParser::parse("chmod 600 /secret").unwrap(),
            Some(FsCommand::Chmod {
                mode: 0o600,
                path: "/secret".to_string()
            })
        );
    }

    #[test]
    fn test_skip_comments_and_blank_lines() {
        assert_eq!(FsCommandParser::parse("   ").unwrap(), None);
        assert_eq!(FsCommandParser::parse("# setup").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            FsCommandParser::parse("rename /a /b"),
            Err(CommandError::UnknownCommand("rename".to_string()))
        );
        assert_eq!(
            FsCommandParser::parse("cat"),
            Err(CommandError::MissingArgument("path".to_string()))
        );
        assert_eq!(
            FsCommandParser::parse("mkdir /x 9"),
            Err(CommandError::InvalidNumber("9".to_string()))
        );
        assert_eq!(
            FsCommandParser::parse("write /x"),
            Err(CommandError::MissingArgument("text".to_string()))
        );
    }
}
