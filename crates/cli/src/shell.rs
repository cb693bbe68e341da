//! Interactive session.
//!
//! One line per intent. State (login, selection, last report) lives in the
//! controller for as long as the shell runs; failures are reported and the
//! loop carries on.

use std::io::{self, BufRead, Write};

use riskview_cli::render;
use riskview_cli::Controller;
use riskview_core::SectionKind;

const HELP: &str = "\
Commands:
  login [USER [PASSWORD]]     log in (prompts for what is missing)
  logout                      forget the saved login
  whoami                      show the logged-in user
  health                      check the service
  sessions                    list past analysis sessions
  select PATH...              choose images to upload (replaces the selection)
  files                       show the selection
  analyze [LABEL...]          upload the selection and show the report
  show                        show the last report again
  dismiss                     put the last report away
  export risk|sgr|rec|zip     write a download into the output directory
  feedback RATING TEXT...     rate the last report (1-5)
  status                      current phase and session
  help                        this text
  quit                        leave the shell";

const PROMPT: &str = "riskview> ";

/// Run against the process stdin/stdout.
pub fn run(ctrl: &mut Controller) -> io::Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = io::stdin();
    let stdout = io::stdout();
    if interactive {
        writeln!(stdout.lock(), "riskview {} - type `help` for commands", env!("CARGO_PKG_VERSION"))?;
    }
    run_with(ctrl, stdin.lock(), &mut stdout.lock(), interactive)
}

pub(crate) fn run_with<R: BufRead>(
    ctrl: &mut Controller,
    mut input: R,
    out: &mut dyn Write,
    interactive: bool,
) -> io::Result<()> {
    let mut line = String::new();
    loop {
        if interactive {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((command, args)) = words.split_first() else {
            continue;
        };
        if matches!(*command, "quit" | "exit") {
            break;
        }
        dispatch(ctrl, command, args, &mut input, out)?;
    }
    Ok(())
}

/// Refusals are already on stderr as notices; only output goes to `out`.
fn dispatch<R: BufRead>(
    ctrl: &mut Controller,
    command: &str,
    args: &[&str],
    input: &mut R,
    out: &mut dyn Write,
) -> io::Result<()> {
    match command {
        "help" | "?" => writeln!(out, "{}", HELP)?,
        "status" => {
            write!(out, "phase: {}", ctrl.phase())?;
            if let Some(user) = ctrl.user() {
                write!(out, ", user: {}", user.display_name())?;
            }
            if let Some(id) = &ctrl.state().current_session_id {
                write!(out, ", session: {}", id)?;
            }
            writeln!(out)?;
        }
        "login" => {
            let username = match args.first() {
                Some(u) => u.to_string(),
                None => read_field(input, out, "username")?,
            };
            let password = match args.get(1) {
                Some(p) => p.to_string(),
                None => read_field(input, out, "password")?,
            };
            let _ = ctrl.login(&username, &password);
        }
        "logout" => ctrl.logout(),
        "whoami" => {
            if let Ok(user) = ctrl.whoami() {
                render::render_user(out, &user)?;
            }
        }
        "health" => {
            let _ = ctrl.check_health();
        }
        "sessions" => {
            if let Ok(sessions) = ctrl.list_sessions() {
                let text = serde_json::to_string_pretty(&sessions).unwrap_or_else(|_| sessions.to_string());
                writeln!(out, "{}", text)?;
            }
        }
        "select" => {
            if ctrl.select_files(args).is_ok() {
                render::render_selection(out, ctrl.selection())?;
            }
        }
        "files" => render::render_selection(out, ctrl.selection())?,
        "analyze" => {
            let label = args.join(" ");
            let label = (!label.is_empty()).then_some(label.as_str());
            if ctrl.analyze(label).is_ok() {
                if let Some(report) = ctrl.report() {
                    render::render_report(out, report)?;
                }
            }
        }
        "show" => match ctrl.report() {
            Some(report) if ctrl.phase().has_results() => render::render_report(out, report)?,
            _ => writeln!(out, "no report on screen")?,
        },
        "dismiss" => {
            let _ = ctrl.acknowledge();
        }
        "export" => {
            let _ = match args.first().copied() {
                Some("risk") => ctrl.export_table(SectionKind::Risk),
                Some("sgr") => ctrl.export_table(SectionKind::Checklist),
                Some("rec") => ctrl.export_recommendations(),
                Some("zip") => ctrl.export_archive(),
                _ => {
                    writeln!(out, "usage: export risk|sgr|rec|zip")?;
                    return Ok(());
                }
            };
        }
        "feedback" => {
            let rating = args.first().and_then(|r| r.parse::<u8>().ok());
            let text = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            let _ = ctrl.submit_feedback(rating, &text);
        }
        other => writeln!(out, "unknown command: {} (try `help`)", other)?,
    }
    Ok(())
}

fn read_field<R: BufRead>(input: &mut R, out: &mut dyn Write, label: &str) -> io::Result<String> {
    write!(out, "{}: ", label)?;
    out.flush()?;
    let mut buf = String::new();
    input.read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskview_cli::RecordingNotifier;
    use riskview_client::ApiClient;
    use riskview_config::storage::MemoryStore;
    use riskview_io::ExportEngine;

    fn controller(notes: &RecordingNotifier) -> (Controller, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        // nothing listens on the discard port; these tests never reach the network
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let ctrl = Controller::new(
            client,
            ExportEngine::new(dir.path()),
            Box::new(MemoryStore::new()),
            Box::new(notes.clone()),
        );
        (ctrl, dir)
    }

    fn run_script(ctrl: &mut Controller, script: &str) -> String {
        let mut out = Vec::new();
        run_with(ctrl, script.as_bytes(), &mut out, false).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn status_before_login() {
        let notes = RecordingNotifier::new();
        let (mut ctrl, _dir) = controller(&notes);
        assert_eq!(run_script(&mut ctrl, "status\n"), "phase: unauthenticated\n");
    }

    #[test]
    fn intents_without_login_are_refused() {
        let notes = RecordingNotifier::new();
        let (mut ctrl, _dir) = controller(&notes);
        let out = run_script(&mut ctrl, "analyze\nexport zip\nfeedback 5 좋아요\n");
        assert_eq!(out, "");
        assert_eq!(
            notes.messages(),
            vec!["로그인이 필요합니다.", "분석 결과가 없습니다.", "로그인이 필요합니다."]
        );
    }

    #[test]
    fn empty_login_prompts_then_rejects() {
        let notes = RecordingNotifier::new();
        let (mut ctrl, _dir) = controller(&notes);
        let out = run_script(&mut ctrl, "login\n\n\n");
        assert_eq!(out, "username: password: ");
        assert_eq!(notes.messages(), vec!["사용자명과 비밀번호를 입력해주세요."]);
    }

    #[test]
    fn quit_stops_reading() {
        let notes = RecordingNotifier::new();
        let (mut ctrl, _dir) = controller(&notes);
        let out = run_script(&mut ctrl, "\n  \nbogus\nquit\nstatus\n");
        assert_eq!(out, "unknown command: bogus (try `help`)\n");
    }

    #[test]
    fn export_usage() {
        let notes = RecordingNotifier::new();
        let (mut ctrl, _dir) = controller(&notes);
        assert_eq!(run_script(&mut ctrl, "export pdf\n"), "usage: export risk|sgr|rec|zip\n");
        assert!(notes.notices().is_empty());
    }
}
