/// Name processing utility functions / 文件名处理工具函数

/// Clean and normalize a storage name / 清理和规范化文件名
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Collapse duplicate `/` and drop `.` components / 合并重复的 / 并去掉 .
/// 3. Resolve `..` against the preceding component / 处理 ..
///
/// Relative names stay relative, an empty result becomes `"."`.
pub fn clean_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    if name.is_empty() {
        return ".".to_string();
    }

    let absolute = name.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in name.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if parts.last().map_or(false, |p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    // 相对路径保留越界的 ..
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Split name into (root, extension) / 分离文件名和扩展名
///
/// The extension keeps its dot and is taken from the last path component only.
/// Leading dots of the component never start an extension (`.bashrc` has none).
pub fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    let file_name = &name[file_start..];

    let Some(dot) = file_name.rfind('.') else {
        return (name, "");
    };

    if file_name[..dot].chars().all(|c| c == '.') {
        return (name, "");
    }

    let split_at = file_start + dot;
    (&name[..split_at], &name[split_at..])
}

/// Build the n-th collision-free candidate: `root_n.ext` / 生成带序号的候选文件名
pub fn numbered_name(name: &str, count: u64) -> String {
    let (root, ext) = split_extension(name);
    format!("{}_{}{}", root, count, ext)
}

/// Percent-encode a name for use in a URL path, keeping `/` / URL编码（保留路径分隔符）
pub fn encode_path(name: &str) -> String {
    name.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name(""), ".");
        assert_eq!(clean_name("."), ".");
        assert_eq!(clean_name("a/b/c"), "a/b/c");
        assert_eq!(clean_name("/a/b/c"), "/a/b/c");
        assert_eq!(clean_name("a\\b\\c.txt"), "a/b/c.txt");
        assert_eq!(clean_name("a//b///c"), "a/b/c");
        assert_eq!(clean_name("a/./b/../c"), "a/c");
        assert_eq!(clean_name("a/b/"), "a/b");
        assert_eq!(clean_name("../a"), "../a");
        assert_eq!(clean_name("a/../../b"), "../b");
        assert_eq!(clean_name("/../a"), "/a");
    }

    #[test]
    fn test_clean_name_idempotent() {
        let samples = [
            "",
            "img.png",
            "a\\..\\..\\b",
            "./x/./y/",
            "/root//dir/../file.tar.gz",
            "..\\..",
            "media\\2024\\01\\photo.JPG",
        ];
        for sample in samples {
            let once = clean_name(sample);
            assert_eq!(clean_name(&once), once, "not idempotent for {:?}", sample);
            assert!(!once.contains('\\'));
        }
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a/b.txt"), ("a/b", ".txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("dir.d/file"), ("dir.d/file", ""));
        assert_eq!(split_extension("a/..b"), ("a/..b", ""));
        assert_eq!(split_extension("a/x..b"), ("a/x.", ".b"));
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("img.png", 1), "img_1.png");
        assert_eq!(numbered_name("a/b.txt", 2), "a/b_2.txt");
        assert_eq!(numbered_name("README", 3), "README_3");
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("a/b c.txt"), "a/b%20c.txt");
        assert_eq!(encode_path("img_1.png"), "img_1.png");
    }
}
