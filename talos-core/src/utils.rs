//! 容器内部工具
//!
//! 命名助手从 Rust 类型路径推导默认 Bean 名（自动命名注册使用）；
//! 依赖模块在刷新进入预实例化之前对显式 depends_on 声明做整体预检。

/// Bean 默认命名
pub mod naming {
    /// 从完整类型路径推导默认 Bean 名
    ///
    /// 去掉模块路径与泛型参数，简名首字母小写：
    /// `app::service::UserService` 得到 `userService`。
    pub fn default_bean_name(type_path: &str) -> String {
        let simple = type_path.rsplit("::").next().unwrap_or(type_path);
        let simple = simple.split('<').next().unwrap_or(simple);
        decapitalize(simple)
    }

    /// 首字母小写；已是小写或为空时原样返回
    pub fn decapitalize(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => {
                first.to_lowercase().chain(chars).collect()
            }
            _ => s.to_string(),
        }
    }
}

/// depends_on 图的预检
pub mod dependency {
    use std::collections::HashMap;

    /// 在 depends_on 图中寻找成环的链
    ///
    /// 图外的目标视作叶子（由调用方先行校验存在性）。找到环时返回
    /// 完整链，链首与链尾是同一个名称；迭代式深搜，深链不会爆栈。
    pub fn find_depends_on_cycle(graph: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
        // 0 未访问，1 在当前链上，2 已完成
        let mut state: HashMap<&str, u8> = graph.keys().map(|k| (k.as_str(), 0)).collect();

        for start in graph.keys() {
            if state.get(start.as_str()).copied() != Some(0) {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            state.insert(start.as_str(), 1);

            while let Some(frame) = stack.last_mut() {
                let (node, index) = (frame.0, frame.1);
                frame.1 += 1;

                let deps = graph.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if index >= deps.len() {
                    state.insert(node, 2);
                    stack.pop();
                    continue;
                }

                let next = deps[index].as_str();
                match state.get(next).copied() {
                    Some(0) => {
                        state.insert(next, 1);
                        stack.push((next, 0));
                    }
                    Some(1) => {
                        // 当前链上再次遇到 next：截取环并闭合
                        let mut chain: Vec<String> = stack
                            .iter()
                            .map(|(name, _)| (*name).to_string())
                            .skip_while(|name| name != next)
                            .collect();
                        chain.push(next.to_string());
                        return Some(chain);
                    }
                    // 已完成的节点与图外目标都不构成环
                    _ => {}
                }
            }
        }
        None
    }
}
