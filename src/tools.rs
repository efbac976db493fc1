use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;

use crate::layout::PAGE_SEPARATOR;
use crate::model::OutlineEntry;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs a command to completion, killing it once `timeout` elapses.
pub fn run_command(command: &mut Command, timeout: Option<Duration>) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();

    let Some(timeout) = timeout else {
        return command
            .output()
            .with_context(|| format!("failed to execute {program}"));
    };

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to execute {program}"))?;

    let stdout_reader = child.stdout.take().map(spawn_pipe_reader);
    let stderr_reader = child.stderr.take().map(spawn_pipe_reader);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("failed to poll {program}"))?
        {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!("{program} timed out after {}s", timeout.as_secs_f64());
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join_pipe_reader(stdout_reader),
        stderr: join_pipe_reader(stderr_reader),
    })
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn join_pipe_reader(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn run_checked(command: &mut Command, timeout: Option<Duration>, what: &str) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = run_command(command, timeout)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} returned non-zero exit status for {}: {}",
            program,
            what,
            stderr.trim()
        );
    }
    Ok(output)
}

pub fn command_available(program: &str) -> bool {
    Command::new(program)
        .arg("-v")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

pub fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

pub fn pdfinfo_page_count(pdf_path: &Path, timeout: Option<Duration>) -> Result<u32> {
    let output = run_checked(
        Command::new("pdfinfo").arg(pdf_path),
        timeout,
        &pdf_path.display().to_string(),
    )?;
    parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("pdfinfo reported no page count for {}", pdf_path.display()))
}

pub fn parse_pdfinfo_pages(report: &str) -> Option<u32> {
    report.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|value| value.trim().parse::<u32>().ok())
    })
}

/// Page texts for `first..=last`, one entry per form feed emitted by pdftotext.
pub fn pdftotext_pages(
    pdf_path: &Path,
    first: u32,
    last: Option<u32>,
    timeout: Option<Duration>,
) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg(first.max(1).to_string());
    if let Some(last) = last {
        command.arg("-l").arg(last.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = run_checked(&mut command, timeout, &pdf_path.display().to_string())?;

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split(PAGE_SEPARATOR)
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    // pdftotext terminates every page with a form feed, including the last.
    if pages.last().is_some_and(|page| page.is_empty()) {
        pages.pop();
    }

    Ok(pages)
}

pub fn pdfimages_counts(
    pdf_path: &Path,
    first: u32,
    last: Option<u32>,
    timeout: Option<Duration>,
) -> Result<BTreeMap<u32, u32>> {
    let mut command = Command::new("pdfimages");
    command.arg("-list").arg("-f").arg(first.max(1).to_string());
    if let Some(last) = last {
        command.arg("-l").arg(last.to_string());
    }
    command.arg(pdf_path);

    let output = run_checked(&mut command, timeout, &pdf_path.display().to_string())?;
    Ok(parse_pdfimages_list(&String::from_utf8_lossy(&output.stdout)))
}

pub fn parse_pdfimages_list(listing: &str) -> BTreeMap<u32, u32> {
    let mut counts = BTreeMap::new();
    for line in listing.lines() {
        let Some(page) = line
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<u32>().ok())
        else {
            continue;
        };
        *counts.entry(page).or_insert(0) += 1;
    }
    counts
}

pub fn pdftohtml_outline(pdf_path: &Path, timeout: Option<Duration>) -> Result<Vec<OutlineEntry>> {
    let output = run_checked(
        Command::new("pdftohtml")
            .arg("-xml")
            .arg("-i")
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg("1")
            .arg(pdf_path)
            .arg("-stdout"),
        timeout,
        &pdf_path.display().to_string(),
    )?;

    parse_outline_xml(&String::from_utf8_lossy(&output.stdout))
}

/// Reads `<outline>`/`<item page="N">` nesting into level-tagged entries.
/// Items without a page target are skipped.
pub fn parse_outline_xml(xml: &str) -> Result<Vec<OutlineEntry>> {
    let token_regex = Regex::new(
        r#"(?s)<outline[^>]*>|</outline>|<item(?:\s+page="(\d+)")?[^>]*>(.*?)</item>"#,
    )
    .context("failed to compile outline token regex")?;

    let mut depth = 0u32;
    let mut entries = Vec::new();

    for captures in token_regex.captures_iter(xml) {
        let token = captures.get(0).map(|value| value.as_str()).unwrap_or("");
        if token.starts_with("</outline") {
            depth = depth.saturating_sub(1);
            continue;
        }
        if token.starts_with("<outline") {
            depth += 1;
            continue;
        }

        let Some(page) = captures
            .get(1)
            .and_then(|value| value.as_str().parse::<u32>().ok())
        else {
            continue;
        };
        let title = normalize_outline_label(captures.get(2).map(|value| value.as_str()).unwrap_or(""));
        if title.is_empty() {
            continue;
        }

        entries.push(OutlineEntry {
            level: depth.max(1),
            title,
            page,
        });
    }

    Ok(entries)
}

fn normalize_outline_label(raw_label: &str) -> String {
    raw_label
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace('\u{00a0}', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Rasterizes one page and runs tesseract on it.
pub fn ocr_page(
    pdf_path: &Path,
    page_number: u32,
    ocr_lang: &str,
    resolution_dpi: u32,
    timeout: Option<Duration>,
) -> Result<String> {
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let output_root = std::env::temp_dir().join(format!(
        "bookstruct_ocr_{}_{}_{}",
        std::process::id(),
        page_number,
        stamp
    ));
    let png_path = PathBuf::from(format!("{}.png", output_root.display()));

    let what = format!("{} page {}", pdf_path.display(), page_number);
    run_checked(
        Command::new("pdftoppm")
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg("-r")
            .arg(resolution_dpi.to_string())
            .arg("-singlefile")
            .arg("-png")
            .arg(pdf_path)
            .arg(&output_root),
        timeout,
        &what,
    )?;

    if !png_path.exists() {
        bail!("pdftoppm did not produce expected image for {what}");
    }

    let result = run_checked(
        Command::new("tesseract")
            .arg(&png_path)
            .arg("stdout")
            .arg("-l")
            .arg(ocr_lang),
        timeout,
        &what,
    );
    let _ = fs::remove_file(&png_path);
    let output = result?;

    Ok(String::from_utf8_lossy(&output.stdout)
        .replace('\u{0000}', "")
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_levels_follow_nesting_depth() {
        let xml = r#"<?xml version="1.0"?>
<pdf2xml>
<outline>
<item page="3">Preface</item>
<item page="10">Chapter 1 &amp; More</item>
<outline>
<item page="11">1.1 Basics</item>
<item page="15">1.2 Details</item>
</outline>
<item>Dangling</item>
<item page="40">Chapter 2</item>
</outline>
<page number="1"></page>
</pdf2xml>"#;

        let entries = parse_outline_xml(xml).expect("outline parses");
        let summary: Vec<(u32, &str, u32)> = entries
            .iter()
            .map(|entry| (entry.level, entry.title.as_str(), entry.page))
            .collect();

        assert_eq!(
            summary,
            vec![
                (1, "Preface", 3),
                (1, "Chapter 1 & More", 10),
                (2, "1.1 Basics", 11),
                (2, "1.2 Details", 15),
                (1, "Chapter 2", 40),
            ]
        );
    }

    #[test]
    fn pdfinfo_and_pdfimages_reports_parse() {
        let info = "Title:          Sample\nPages:          312\nEncrypted:      no\n";
        assert_eq!(parse_pdfinfo_pages(info), Some(312));
        assert_eq!(parse_pdfinfo_pages("Title: x\n"), None);

        let listing = "page   num  type   width height\n\
                       --------------------------------\n   \
                       1     0 image    1200  1800\n   \
                       1     1 smask    1200  1800\n   \
                       4     2 image     800   600\n";
        let counts = parse_pdfimages_list(listing);
        assert_eq!(counts.get(&1), Some(&2));
        assert_eq!(counts.get(&4), Some(&1));
        assert_eq!(counts.get(&2), None);
    }

    #[test]
    fn run_command_reports_missing_program() {
        let mut command = Command::new("bookstruct-no-such-program");
        assert!(run_command(&mut command, Some(Duration::from_secs(1))).is_err());
    }
}
