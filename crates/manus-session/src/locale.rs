//! Display locales and their string catalogs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Supported display languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    Zh,
}

impl Locale {
    /// Every locale, in menu order
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    /// Short code stored in the config file
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Name of the language in that language
    pub fn label(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Zh => "中文",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "zh" | "chinese" | "中文" => Ok(Locale::Zh),
            other => Err(format!("Unknown locale: '{}' (expected en or zh)", other)),
        }
    }
}

/// Catalog keys are the English strings themselves
static ZH: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Relative time
        ("Just now", "刚刚"),
        ("minutes ago", "分钟前"),
        ("hours ago", "小时前"),
        ("days ago", "天前"),
        ("months ago", "个月前"),
        ("years ago", "年前"),
        // Tool families
        ("Terminal", "终端"),
        ("File", "文件"),
        ("Browser", "浏览器"),
        ("Information", "信息"),
        ("Search", "搜索"),
        ("Message", "消息"),
        // Shell functions
        ("Executing command", "正在执行命令"),
        ("Viewing command output", "正在查看命令输出"),
        ("Waiting for command completion", "正在等待命令完成"),
        ("Writing data to process", "正在向进程写入数据"),
        ("Terminating process", "正在终止进程"),
        // File functions
        ("Reading file", "正在读取文件"),
        ("Writing file", "正在写入文件"),
        ("Replacing file content", "正在替换文件内容"),
        ("Searching file content", "正在搜索文件内容"),
        ("Finding file", "正在查找文件"),
        // Browser functions
        ("Viewing webpage", "正在查看网页"),
        ("Navigating to webpage", "正在导航到网页"),
        ("Restarting browser", "正在重启浏览器"),
        ("Clicking element", "正在点击元素"),
        ("Entering text", "正在输入文本"),
        ("Moving mouse", "正在移动鼠标"),
        ("Pressing key", "正在按键"),
        ("Selecting option", "正在选择选项"),
        ("Scrolling up", "正在向上滚动"),
        ("Scrolling down", "正在向下滚动"),
        ("Executing JS code", "正在执行 JS 代码"),
        ("Viewing console output", "正在查看控制台输出"),
        // Search and message functions
        ("Searching web", "正在搜索网络"),
        ("Sending notification", "正在发送通知"),
        ("Asking question", "正在提问"),
        // Session chrome
        ("New conversation", "新对话"),
        ("Task completed", "任务已完成"),
        ("Thinking", "思考中"),
    ])
});

/// Looks up display strings for one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Catalog {
    locale: Locale,
}

impl Catalog {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Translate a key, falling back to the key itself
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        match self.locale {
            Locale::En => key,
            Locale::Zh => ZH.get(key).copied().unwrap_or(key),
        }
    }

    /// Whether a translation exists for this key in every locale
    pub fn has_key(key: &str) -> bool {
        ZH.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_is_identity() {
        let catalog = Catalog::new(Locale::En);
        assert_eq!(catalog.t("hours ago"), "hours ago");
        assert_eq!(catalog.t("anything"), "anything");
    }

    #[test]
    fn test_chinese_lookup_and_fallback() {
        let catalog = Catalog::new(Locale::Zh);
        assert_eq!(catalog.t("Just now"), "刚刚");
        assert_eq!(catalog.t("Terminal"), "终端");
        assert_eq!(catalog.t("untranslated"), "untranslated");
    }

    #[test]
    fn test_default_locale_is_zh() {
        assert_eq!(Locale::default(), Locale::Zh);
        assert_eq!(Catalog::default().locale(), Locale::Zh);
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!("en".parse::<Locale>(), Ok(Locale::En));
        assert_eq!(" ZH ".parse::<Locale>(), Ok(Locale::Zh));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_locale_serde_codes() {
        assert_eq!(serde_json::to_string(&Locale::En).unwrap(), "\"en\"");
        let parsed: Locale = serde_json::from_str("\"zh\"").unwrap();
        assert_eq!(parsed, Locale::Zh);
    }
}
