use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_texmark"))
}

fn temp_dir(name: &str) -> PathBuf {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("time");
    let dir = env::temp_dir().join(format!(
        "texmark_cli_{}_{}_{}",
        name,
        std::process::id(),
        now.as_nanos()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write input");
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .args(["--no-graphics", "--out-dir", "out"])
        .args(args)
        .output()
        .expect("run")
}

#[test]
fn converts_a_batch_with_cross_file_links() {
    let dir = temp_dir("batch");
    write(
        &dir,
        "ch1/intro.tex",
        "\\chapter{Introduction}\nSee \\thmref{main} and \\emph{also} $x^2$.\n",
    );
    write(
        &dir,
        "ch2/trees.tex",
        "\\chapter{Trees}\n\\begin{thm}\\thmlabel{main}\nEvery tree is a graph.\n\\end{thm}\n",
    );

    let output = run(&dir, &["ch1/intro.tex", "ch2/trees.tex"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let intro = fs::read_to_string(dir.join("out/ch1/intro.html")).expect("intro html");
    assert!(intro.contains("<title>Introduction</title>"));
    assert!(intro.contains("<a href=\"../ch2/trees.html#thm:2.1\">Theorem&nbsp;2.1</a>"));
    assert!(intro.contains(r"\(x^2\)"));

    let toc = fs::read_to_string(dir.join("out/toc.html")).expect("toc html");
    assert!(toc.contains("href=\"ch2/trees.html#chapter:2\""));
    assert!(dir.join("out/texmark.css").is_file());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_input_is_fatal() {
    let dir = temp_dir("missing");
    let output = run(&dir, &["nope.tex"]);
    assert!(!output.status.success(), "expected error exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope.tex"), "stderr: {stderr}");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn unbalanced_environment_is_fatal() {
    let dir = temp_dir("unbalanced");
    write(&dir, "bad.tex", "\\begin{itemize}\\item never closed\n");
    let output = run(&dir, &["bad.tex"]);
    assert!(!output.status.success(), "expected error exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("itemize"), "stderr: {stderr}");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn diagnostics_json_lists_warnings() {
    let dir = temp_dir("json");
    write(&dir, "a.tex", "\\lemref{nowhere} \\fictionalcmd{x}\n");
    let output = run(&dir, &["--diagnostics", "json", "a.tex"]);
    assert!(output.status.success(), "warnings keep a success exit code");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('[').expect("json array in stderr");
    let end = stderr.rfind(']').expect("json array end");
    let diagnostics: serde_json::Value =
        serde_json::from_str(&stderr[start..=end]).expect("valid json");
    let codes: Vec<&str> = diagnostics
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|diag| diag["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["W_UNDEFINED_LABEL", "W_UNPROCESSED_COMMAND"]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn sanitize_strips_comments() {
    let dir = temp_dir("sanitize");
    write(&dir, "a.tex", "\\begin{center}x\\end{center}\n");

    let output = run(&dir, &["a.tex"]);
    assert!(output.status.success());
    let raw = fs::read_to_string(dir.join("out/a.html")).expect("html");
    assert!(raw.contains("<!-- center -->"));

    let output = run(&dir, &["--sanitize", "a.tex"]);
    assert!(output.status.success());
    let clean = fs::read_to_string(dir.join("out/a.html")).expect("html");
    assert!(!clean.contains("<!-- center -->"));
    assert!(clean.contains("<div class=\"center\">x</div>"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn colliding_outputs_are_rejected() {
    let dir = temp_dir("collide");
    write(&dir, "x/intro.tex", "\\chapter{X}\n");
    write(&dir, "y/intro.tex", "\\chapter{Y}\n");
    let elsewhere = temp_dir("collide_cwd");
    let x = dir.join("x/intro.tex");
    let y = dir.join("y/intro.tex");

    let output = run(
        &elsewhere,
        &[x.to_str().expect("utf8 path"), y.to_str().expect("utf8 path")],
    );
    assert!(!output.status.success(), "expected error exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("intro.html"), "stderr: {stderr}");
    assert!(!elsewhere.join("out/intro.html").exists());
    let _ = fs::remove_dir_all(dir);
    let _ = fs::remove_dir_all(elsewhere);
}

#[test]
fn fatal_errors_appear_in_json_diagnostics() {
    let dir = temp_dir("fatal_json");
    write(&dir, "bad.tex", "\\begin{itemize}\\item never closed\n");
    let output = run(&dir, &["--diagnostics", "json", "bad.tex"]);
    assert!(!output.status.success(), "expected error exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"code\": \"E_CONVERSION\""), "stderr: {stderr}");
    assert!(stderr.contains("\"severity\": \"error\""), "stderr: {stderr}");
    let _ = fs::remove_dir_all(dir);
}

#[cfg(unix)]
#[test]
fn drawings_are_found_beside_sources_outside_the_working_directory() {
    use std::os::unix::fs::PermissionsExt;

    let dir = temp_dir("graphics");
    write(&dir, "book/ch.tex", "\\chapter{Trees}\n\\includegraphics{tree-2}\n");
    write(&dir, "book/tree.ipe", "");
    write(&dir, "fake-render", "#!/bin/sh\necho \"$4 page $3\" > \"$5\"\n");
    let tool = dir.join("fake-render");
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).expect("chmod");
    let work = dir.join("work");
    fs::create_dir_all(&work).expect("create work dir");

    let output = Command::new(bin_path())
        .current_dir(&work)
        .env("RUST_LOG", "off")
        .args(["--out-dir", "out", "--graphics-tool"])
        .arg(&tool)
        .arg("../book/ch.tex")
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(work.join("out/book/ch.html").is_file());
    let svg = fs::read_to_string(work.join("out/book/tree-2.svg")).expect("svg written");
    assert!(svg.contains("tree.ipe page 2"), "{svg}");
    let _ = fs::remove_dir_all(dir);
}
