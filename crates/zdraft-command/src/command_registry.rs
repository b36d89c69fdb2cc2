//! 命令注册表
//!
//! 支持完整命令、子类型名、快捷键、别名和 Tab 补全。
//! 查找不区分大小写。

use crate::command::Command;
use crate::error::CommandError;
use std::collections::HashMap;
use std::path::Path;

/// 查找结果
pub struct CommandMatch<'a> {
    pub command: &'a dyn Command,
    /// 通过子类型名找到时的类型
    pub command_type: Option<&'static str>,
}

/// 命令注册表
///
/// 管理所有命令、快捷键和别名的映射
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
    /// 完整命令 / 子类型名 -> (命令序号, 子类型)
    main_commands: HashMap<String, (usize, Option<&'static str>)>,
    /// 快捷键 -> 命令序号
    short_commands: HashMap<String, usize>,
    /// 用户别名 -> 完整命令
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    /// 创建空的命令注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部内置命令
    pub fn with_default_commands() -> Self {
        let mut registry = Self::new();
        crate::commands::register_default_commands(&mut registry);
        registry
    }

    /// 注册命令；同名命令被替换
    pub fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name().to_uppercase();
        let index = match self.main_commands.get(&name) {
            Some(&(index, None)) => {
                self.commands[index] = command;
                index
            }
            _ => {
                self.commands.push(command);
                self.commands.len() - 1
            }
        };

        let command = &self.commands[index];
        self.main_commands.insert(name, (index, None));
        for command_type in command.types() {
            let key = command_type.to_uppercase();
            // 子类型名不覆盖其他完整命令
            if !matches!(self.main_commands.get(&key), Some((i, None)) if *i != index) {
                self.main_commands.insert(key, (index, Some(*command_type)));
            }
        }
        if let Some(hotkey) = command.hotkey() {
            self.short_commands.insert(hotkey.to_uppercase(), index);
        }
    }

    /// 查找命令：完整命令 > 快捷键 > 别名
    pub fn lookup(&self, input: &str) -> Option<CommandMatch<'_>> {
        let input_upper = input.trim().to_uppercase();

        let (index, command_type) = if let Some(&entry) = self.main_commands.get(&input_upper) {
            entry
        } else if let Some(&index) = self.short_commands.get(&input_upper) {
            (index, None)
        } else {
            let command = self.aliases.get(&input_upper)?;
            *self.main_commands.get(command)?
        };

        Some(CommandMatch {
            command: self.commands.get(index)?.as_ref(),
            command_type,
        })
    }

    /// Tab 补全
    ///
    /// 返回所有以 prefix 开头的命令和子类型名
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let prefix_upper = prefix.to_uppercase();
        let mut results: Vec<String> = self
            .main_commands
            .keys()
            .filter(|cmd| cmd.starts_with(&prefix_upper))
            .map(|cmd| cmd.to_lowercase())
            .collect();

        results.sort();
        results
    }

    /// 添加用户别名
    pub fn add_alias(&mut self, alias: &str, command: &str) {
        let alias_upper = alias.to_uppercase();
        let command_upper = command.to_uppercase();

        // 不允许覆盖现有命令
        if self.main_commands.contains_key(&alias_upper) {
            return;
        }

        // 确保目标命令存在
        if self.main_commands.contains_key(&command_upper) {
            self.aliases.insert(alias_upper, command_upper);
        }
    }

    /// 移除别名
    pub fn remove_alias(&mut self, alias: &str) {
        self.aliases.remove(&alias.to_uppercase());
    }

    /// 从文件加载别名
    ///
    /// 文件格式：每行 "alias\tcommand"，以 # 开头的行是注释
    pub fn load_aliases(&mut self, path: &Path) -> Result<(), CommandError> {
        let content = std::fs::read_to_string(path)?;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                self.add_alias(parts[0], parts[1]);
            }
        }

        Ok(())
    }

    /// 保存别名到文件
    pub fn save_aliases(&self, path: &Path) -> Result<(), CommandError> {
        let mut content = String::new();
        content.push_str("# ZDraft Command Aliases\n");
        content.push_str("# Format: alias\\tcommand\n\n");

        let mut aliases: Vec<_> = self.aliases.iter().collect();
        aliases.sort();
        for (alias, command) in aliases {
            content.push_str(&format!("{}\t{}\n", alias.to_lowercase(), command.to_lowercase()));
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 所有命令名
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.iter().map(|c| c.name()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = CommandRegistry::with_default_commands();

        // 完整命令
        assert_eq!(registry.lookup("LINE").unwrap().command.name(), "line");
        assert_eq!(registry.lookup("line").unwrap().command.name(), "line");

        // 快捷键
        assert_eq!(registry.lookup("L").unwrap().command.name(), "line");
        assert_eq!(registry.lookup("m").unwrap().command.name(), "move");

        // 子类型
        let found = registry.lookup("polyline").unwrap();
        assert_eq!(found.command.name(), "line");
        assert_eq!(found.command_type, Some("polyline"));

        // 不存在的命令
        assert!(registry.lookup("NOTEXIST").is_none());
    }

    #[test]
    fn test_complete() {
        let registry = CommandRegistry::with_default_commands();

        let completions = registry.complete("LI");
        assert_eq!(completions, vec!["line".to_string()]);
        assert_eq!(registry.complete("p"), vec!["polyline".to_string()]);
    }

    #[test]
    fn test_alias() {
        let mut registry = CommandRegistry::with_default_commands();

        registry.add_alias("LL", "LINE");
        assert_eq!(registry.lookup("LL").unwrap().command.name(), "line");

        // 不能覆盖已有命令
        registry.add_alias("circle", "line");
        assert_eq!(registry.lookup("circle").unwrap().command.name(), "circle");

        registry.remove_alias("LL");
        assert!(registry.lookup("LL").is_none());
    }

    #[test]
    fn test_alias_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.txt");

        let mut registry = CommandRegistry::with_default_commands();
        registry.add_alias("ci", "circle");
        registry.add_alias("pl", "polyline");
        registry.save_aliases(&path).unwrap();

        let mut loaded = CommandRegistry::with_default_commands();
        loaded.load_aliases(&path).unwrap();
        assert_eq!(loaded.lookup("CI").unwrap().command.name(), "circle");
        assert_eq!(loaded.lookup("pl").unwrap().command_type, Some("polyline"));
    }

    #[test]
    fn test_missing_alias_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = CommandRegistry::with_default_commands();
        let result = registry.load_aliases(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(CommandError::Io(_))));
    }
}
