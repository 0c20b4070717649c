fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let hash = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default();

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let version = if hash.is_empty() {
        pkg_version
    } else {
        format!("{pkg_version} ({hash})")
    };
    println!("cargo:rustc-env=PICSIZER_VERSION={version}");
}
