use std::collections::BTreeMap;

pub type SymbolTable = BTreeMap<String, u64>;
/// Keyed by file name including its extension, e.g. `user32.dll`.
pub type ModuleBaseTable = BTreeMap<String, u64>;
pub type ExportTable = BTreeMap<String, u64>;
/// Keyed by module short name without extension, e.g. `user32`.
pub type ModuleExportTable = BTreeMap<String, ExportTable>;

/// The lookup data identifiers are resolved against. Built once by the host
/// and only ever read during evaluation.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTables {
    pub symbols: SymbolTable,
    pub module_bases: ModuleBaseTable,
    pub module_exports: ModuleExportTable,
}

impl ResolutionTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, name: impl Into<String>, value: u64) -> Self {
        self.symbols.insert(name.into(), value);
        self
    }

    pub fn with_module(mut self, file_name: impl Into<String>, base: u64) -> Self {
        self.module_bases.insert(file_name.into(), base);
        self
    }

    pub fn with_export(
        mut self,
        module: impl Into<String>,
        export: impl Into<String>,
        address: u64,
    ) -> Self {
        self.module_exports
            .entry(module.into())
            .or_default()
            .insert(export.into(), address);
        self
    }

    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }

    pub fn module_base(&self, file_name: &str) -> Option<u64> {
        self.module_bases.get(file_name).copied()
    }

    pub fn exports(&self, module: &str) -> Option<&ExportTable> {
        self.module_exports.get(module)
    }

    /// First export called `name` in any module, scanning modules in table
    /// order.
    pub fn find_export(&self, name: &str) -> Option<u64> {
        self.module_exports
            .values()
            .find_map(|exports| exports.get(name).copied())
    }

    /// Demonstration data used by the REPL and the fixture tests.
    pub fn sample() -> Self {
        Self::new()
            .with_symbol("s1", 0x222)
            .with_symbol("s2", 0x333)
            .with_symbol("生命值", 0x64)
            .with_module("game.exe", 0x0040_0000)
            .with_module("my game.exe", 0x1000_0000)
            .with_module("user32.dll", 0x763b_0000)
            .with_module("kernel32.dll", 0x75a0_0000)
            .with_export("user32", "MessageBoxA", 0x1)
            .with_export("user32", "MessageBoxW", 0x2)
            .with_export("kernel32", "GetProcAddress", 0x75a1_b2c0)
            .with_export("kernel32", "Sleep", 0x75a1_0aa0)
    }
}
