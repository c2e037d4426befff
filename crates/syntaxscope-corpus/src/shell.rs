//! Shell namespace guessing from command text.

const POWERSHELL_MARKERS: &[&str] = &[
    "get-", "set-", "new-", "remove-", "-object", "-property", "$_", "$null", "$true", "$false",
];
const PYTHON_MARKERS: &[&str] = &["import ", "def ", "class ", "print(", ".py", "python"];
const ZSH_MARKERS: &[&str] = &["zsh", "setopt", "zstyle"];

/// Guess which shell `command` belongs to. Checked in order: PowerShell,
/// Python, zsh; anything else is `bash`.
pub fn detect_shell(command: &str) -> &'static str {
    let command = command.to_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|m| command.contains(m));

    if has_any(POWERSHELL_MARKERS) {
        "powershell"
    } else if has_any(PYTHON_MARKERS) {
        "python"
    } else if has_any(ZSH_MARKERS) {
        "zsh"
    } else {
        "bash"
    }
}
