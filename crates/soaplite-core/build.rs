use std::env;
use std::path::PathBuf;

// Shared library exporting `soap`, used by the native call tests in `engine::native`.
const FIXTURE: &str = "fixtures/soap_echo.c";

fn main() {
    println!("cargo:rerun-if-changed={FIXTURE}");

    match build_fixture() {
        Ok(dir) => println!("cargo:rustc-env=SOAPLITE_FIXTURE_DIR={}", dir.display()),
        Err(reason) => println!("cargo:warning=native test module not built: {reason}"),
    }
}

fn build_fixture() -> Result<PathBuf, String> {
    let suffix = match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") | Ok("ios") => "dylib",
        Ok("windows") => return Err("only built for unix targets".to_string()),
        _ => "so",
    };
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|e| e.to_string())?)
        .join("native-fixture");
    std::fs::create_dir_all(&out_dir).map_err(|e| e.to_string())?;

    let compiler = cc::Build::new()
        .pic(true)
        .cargo_metadata(false)
        .try_get_compiler()
        .map_err(|e| e.to_string())?;
    let library = out_dir.join(format!("libsoapPy.{suffix}"));
    let status = compiler
        .to_command()
        .arg("-shared")
        .arg(FIXTURE)
        .arg("-o")
        .arg(&library)
        .status()
        .map_err(|e| e.to_string())?;
    if !status.success() {
        return Err(format!(
            "{} exited with {}",
            compiler.path().display(),
            status
        ));
    }
    Ok(out_dir)
}
