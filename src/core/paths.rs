//! 路径工具
//!
//! 字体等资源文件放在可执行文件旁边，通过 `argv[0]` 推导所在目录。

use std::path::{Path, PathBuf};

/// 由 `argv[0]` 推导可执行文件所在目录
///
/// 相对路径会与当前工作目录拼接；只有文件名时返回当前工作目录。
pub fn base_dir(argv0: &str, current_dir: &Path) -> PathBuf {
    let parent = Path::new(argv0)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());

    match parent {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => current_dir.join(dir),
        None => current_dir.to_path_buf(),
    }
}

/// 当前进程的可执行文件目录
///
/// 无法获取工作目录时退化为 `"."`。
pub fn executable_dir() -> PathBuf {
    let argv0 = std::env::args().next().unwrap_or_default();
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    base_dir(&argv0, &current_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_argv0() {
        let dir = base_dir("build/bin/gui_sandbox", Path::new("/home/user/project"));
        assert_eq!(dir, PathBuf::from("/home/user/project/build/bin"));
    }

    #[test]
    fn test_absolute_argv0() {
        let dir = base_dir("/opt/sandbox/gui_sandbox", Path::new("/tmp"));
        assert_eq!(dir, PathBuf::from("/opt/sandbox"));
    }

    #[test]
    fn test_bare_name_uses_current_dir() {
        let dir = base_dir("gui_sandbox", Path::new("/work"));
        assert_eq!(dir, PathBuf::from("/work"));
    }
}
