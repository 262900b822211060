use std::fmt::Write;
use std::path::PathBuf;

use tracing::info;

pub use self::c::C;
pub use self::cpp::Cpp;
use crate::codevalue::{CodeValue, CodeWidth};
use crate::error::GeneratorError;
use crate::predicate::Predicate;

mod c;
mod cpp;

/// Largest value the generated tests enumerate.
pub const MAX_TESTED_CODE: CodeValue = 0x10FFFF;

const BANNER: &str = concat!(
    "// Autogenerated by uniclass ",
    env!("CARGO_PKG_VERSION"),
    ". Do not edit.\n\n"
);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Language {
    C,
    #[default]
    Cpp,
}

impl Language {
    pub fn backend(self) -> &'static dyn Backend {
        match self {
            Self::C => &C,
            Self::Cpp => &Cpp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    /// Emit a test source per classifier.
    pub tests: bool,
    /// Wrap every compare/jump into counting macros.
    pub profiler: bool,
    pub width: CodeWidth,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            tests: true,
            profiler: false,
            width: CodeWidth::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerHook {
    Reset,
    IncTrue,
    IncFalse,
    DecTrue,
    DecFalse,
    Jumps,
}

/// Language specific parts of the emitted sources.
pub trait Backend {
    fn source_ext(&self) -> &'static str;
    fn header_ext(&self) -> &'static str;
    fn bool_type(&self) -> &'static str;
    fn constant(&self, value: bool) -> &'static str;
    fn profiler_hook(&self, hook: ProfilerHook) -> &'static str;

    fn write_header_includes(&self, out: &mut String) -> std::fmt::Result;
    fn write_profiler_decls(&self, out: &mut String) -> std::fmt::Result;
    fn write_profiler_defs(&self, out: &mut String) -> std::fmt::Result;

    fn write_test_includes(&self, out: &mut String) -> std::fmt::Result;
    fn write_test_start(&self, out: &mut String, name: &str, matching: usize) -> std::fmt::Result;
    fn write_test_failure(&self, out: &mut String) -> std::fmt::Result;
    fn write_test_summary(&self, out: &mut String, profiler: bool) -> std::fmt::Result;

    fn write_main(&self, out: &mut String, classifiers: &[String], tests: bool)
        -> std::fmt::Result;
}

/// Emits classifier sources for a set of predicates.
pub struct Generator {
    backend: &'static dyn Backend,
    config: GeneratorConfig,
    classifiers: Vec<String>,
}

impl Generator {
    pub fn new(language: Language, config: GeneratorConfig) -> Self {
        Self::with_backend(language.backend(), config)
    }

    pub fn with_backend(backend: &'static dyn Backend, config: GeneratorConfig) -> Self {
        Self {
            backend,
            config,
            classifiers: Vec::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn classifiers(&self) -> &[String] {
        &self.classifiers
    }

    /// Writes the classifier source and, if enabled, its test.
    ///
    /// `values` must be sorted.
    pub fn generate(
        &mut self,
        name: &str,
        predicate: &Predicate,
        values: &[CodeValue],
    ) -> Result<(), GeneratorError> {
        self.classifiers.push(name.to_owned());

        let ext = self.backend.source_ext();
        let source = self.render_classifier(name, predicate)?;
        self.write_file(&format!("{name}.{ext}"), "classifier", source)?;

        if self.config.tests {
            let source = self.render_test(name, values)?;
            self.write_file(&format!("test_{name}.{ext}"), "classifier test", source)?;
        }
        Ok(())
    }

    /// Writes the files shared by all generated classifiers.
    pub fn finalize(&self) -> Result<(), GeneratorError> {
        let header_ext = self.backend.header_ext();
        let source_ext = self.backend.source_ext();

        let header = self.render_header()?;
        self.write_file(&format!("uniclass.{header_ext}"), "combined header", header)?;

        if self.config.tests {
            let header = self.render_test_header()?;
            self.write_file(
                &format!("test_uniclass.{header_ext}"),
                "combined test header",
                header,
            )?;
        }

        if self.config.profiler {
            let mut out = String::from(BANNER);
            self.backend.write_profiler_defs(&mut out)?;
            self.write_file(&format!("uniclass_profiler.{source_ext}"), "profiler", out)?;
        }

        let mut out = String::from(BANNER);
        self.backend
            .write_main(&mut out, &self.classifiers, self.config.tests)?;
        self.write_file(&format!("main.{source_ext}"), "main", out)
    }

    pub fn render_classifier(
        &self,
        name: &str,
        predicate: &Predicate,
    ) -> Result<String, GeneratorError> {
        let backend = self.backend;
        let mut out = String::from(BANNER);
        writeln!(out, "#include \"uniclass.{}\"\n", backend.header_ext())?;

        if self.config.profiler {
            use ProfilerHook::*;
            let hook = |h| backend.profiler_hook(h);
            writeln!(out, "#define JA(x) {}() && (x) && {}()", hook(IncTrue), hook(DecTrue))?;
            writeln!(out, "#define JO(x) {}() || (x) || {}()", hook(IncFalse), hook(DecFalse))?;
            writeln!(out, "#define JR(x) ({}() && (x))\n", hook(IncTrue))?;
        }

        writeln!(out, "{} {name}(uint32_t c)\n{{", backend.bool_type())?;
        if self.config.profiler {
            writeln!(out, "\t{}();", backend.profiler_hook(ProfilerHook::Reset))?;
        }
        out.push_str("\treturn\n\t\t");
        ExprWriter {
            out: &mut out,
            backend,
            indent: String::from("\t\t"),
            profiler: self.config.profiler,
            domain: self.config.width.max_value(),
        }
        .write(predicate)?;
        out.push_str("\n\t;\n}\n");
        Ok(out)
    }

    pub fn render_test(&self, name: &str, values: &[CodeValue]) -> Result<String, GeneratorError> {
        let backend = self.backend;
        let max = self.config.width.max_value().min(MAX_TESTED_CODE);
        let values = values.iter().copied().filter(|&v| v <= max);
        let profiler = self.config.profiler;

        let mut out = String::from(BANNER);
        backend.write_test_includes(&mut out)?;
        writeln!(out, "#include \"uniclass.{}\"\n", backend.header_ext())?;
        writeln!(out, "void test_{name}()\n{{")?;

        // C forbids empty initializer lists, the count is kept separately
        out.push_str("\tuint32_t codes[] = {");
        let mut n = 0usize;
        for value in values {
            let sep = if n == 0 { "" } else { "," };
            if n % 8 == 0 {
                write!(out, "{sep}\n\t\t{value:#x}")?;
            } else {
                write!(out, "{sep}{value:#x}")?;
            }
            n += 1;
        }
        if n == 0 {
            out.push_str("\n\t\t0");
        }
        out.push_str("\n\t};\n\n");

        writeln!(out, "\tuint32_t c = 0;")?;
        writeln!(out, "\tunsigned failed = 0, i, j, n = {n};")?;
        if profiler {
            writeln!(
                out,
                "\tunsigned match_jumps = 0, unmatched_jumps = 0, ascii_jumps = 0, max_jumps = 0;"
            )?;
        }
        backend.write_test_start(&mut out, name, n)?;
        writeln!(out, "\tfor (i = 0, j = 0; i <= {max:#x}; ++i, ++c)\n\t{{")?;
        writeln!(out, "#ifdef TEST_ONLY_MATCHES")?;
        writeln!(out, "\t\tif (j < n) c = codes[j]; else break;")?;
        writeln!(out, "#endif")?;
        writeln!(out, "\t\t{} b = j < n && c == codes[j];", backend.bool_type())?;
        writeln!(out, "\t\tif (b) ++j;")?;
        writeln!(out, "\t\tif ({name}(c) != b)\n\t\t{{")?;
        backend.write_test_failure(&mut out)?;
        writeln!(out, "\t\t\t++failed;\n\t\t}}")?;
        if profiler {
            let jumps = backend.profiler_hook(ProfilerHook::Jumps);
            writeln!(
                out,
                "\t\tif (b) match_jumps += {jumps}(); else unmatched_jumps += {jumps}();"
            )?;
            writeln!(out, "\t\tif (c < 128) ascii_jumps += {jumps}();")?;
            writeln!(out, "\t\tif ({jumps}() > max_jumps) max_jumps = {jumps}();")?;
        }
        writeln!(out, "\t}}")?;
        backend.write_test_summary(&mut out, profiler)?;
        writeln!(out, "}}")?;
        Ok(out)
    }

    pub fn render_header(&self) -> Result<String, GeneratorError> {
        let backend = self.backend;
        let guard = format!("UNICLASS_{}", backend.header_ext().to_ascii_uppercase());

        let mut out = String::from(BANNER);
        writeln!(out, "#ifndef {guard}\n#define {guard}\n")?;
        backend.write_header_includes(&mut out)?;
        out.push('\n');
        for name in &self.classifiers {
            writeln!(out, "{} {name}(uint32_t c);", backend.bool_type())?;
        }
        out.push('\n');
        if self.config.profiler {
            backend.write_profiler_decls(&mut out)?;
            out.push('\n');
        }
        writeln!(out, "#endif")?;
        Ok(out)
    }

    pub fn render_test_header(&self) -> Result<String, GeneratorError> {
        let guard = format!(
            "TEST_UNICLASS_{}",
            self.backend.header_ext().to_ascii_uppercase()
        );

        let mut out = String::from(BANNER);
        writeln!(out, "#ifndef {guard}\n#define {guard}\n")?;
        for name in &self.classifiers {
            writeln!(out, "void test_{name}();")?;
        }
        out.push_str("\nstatic void test()\n{\n");
        for name in &self.classifiers {
            writeln!(out, "\ttest_{name}();")?;
        }
        out.push_str("}\n\n#endif\n");
        Ok(out)
    }

    fn write_file(
        &self,
        file_name: &str,
        what: &str,
        contents: String,
    ) -> Result<(), GeneratorError> {
        let path = self.config.output_dir.join(file_name);
        info!(path = %path.display(), "writing {what}");
        std::fs::write(&path, contents).map_err(|source| GeneratorError::Write { path, source })
    }
}

/// Classifier name for a comma-separated category list.
pub fn classifier_name(categories: &str) -> String {
    let mut name = String::from("uniclass_");
    name.extend(categories.chars().filter(|c| !c.is_whitespace()).map(|c| match c {
        ',' => '_',
        c => c,
    }));
    name
}

struct ExprWriter<'a> {
    out: &'a mut String,
    backend: &'a dyn Backend,
    indent: String,
    profiler: bool,
    domain: CodeValue,
}

impl ExprWriter<'_> {
    fn write(&mut self, predicate: &Predicate) -> std::fmt::Result {
        match predicate {
            &Predicate::Constant(value) => self.out.push_str(self.backend.constant(value)),
            &Predicate::BitTest {
                mask,
                value,
                equals,
            } => self.write_test(mask & self.domain, value & mask, equals)?,
            Predicate::Conjunction(lhs, rhs) => {
                self.profiled("JA", |w| w.write(lhs))?;
                write!(self.out, "&&\n{}", self.indent)?;
                self.profiled("JR", |w| w.write(rhs))?;
            }
            Predicate::Disjunction(lhs, rhs) => {
                self.indent.push('\t');
                self.out.push_str("(\t");
                self.profiled("JO", |w| w.write(lhs))?;
                let outer = &self.indent[..self.indent.len() - 1];
                write!(self.out, "\n{outer}||\t")?;
                self.profiled("JR", |w| w.write(rhs))?;
                self.indent.pop();
                write!(self.out, "\n{})", self.indent)?;
            }
            Predicate::Conditional { bit, on, off } => {
                self.out.push('(');
                self.profiled("JA", |w| write!(w.out, "!(c&{bit:#x})"))?;
                write!(self.out, "\n{}?\t", self.indent)?;
                self.indent.push('\t');
                self.write(off)?;
                let outer = &self.indent[..self.indent.len() - 1];
                write!(self.out, "\n{outer}:\t")?;
                self.write(on)?;
                self.indent.pop();
                write!(self.out, "\n{})", self.indent)?;
            }
        }
        Ok(())
    }

    fn write_test(&mut self, mask: CodeValue, value: CodeValue, equals: bool) -> std::fmt::Result {
        let whole = mask == self.domain;
        if mask == 0 {
            self.out.push_str(self.backend.constant(equals));
        } else if value == 0 {
            if equals {
                self.out.push('!');
            }
            if whole {
                self.out.push_str("(c)");
            } else {
                write!(self.out, "(c&{mask:#x})")?;
            }
        } else {
            let op = if equals { "==" } else { "!=" };
            if whole {
                write!(self.out, "(c{op}{value:#x})")?;
            } else {
                write!(self.out, "((c&{mask:#x}){op}{value:#x})")?;
            }
        }
        Ok(())
    }

    fn profiled<F>(&mut self, wrapper: &str, f: F) -> std::fmt::Result
    where
        F: FnOnce(&mut Self) -> std::fmt::Result,
    {
        if !self.profiler {
            return f(self);
        }
        write!(self.out, "{wrapper}(")?;
        f(self)?;
        self.out.push(')');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(language: Language, width: u32, profiler: bool) -> Generator {
        Generator::new(
            language,
            GeneratorConfig {
                profiler,
                width: CodeWidth::new(width).unwrap(),
                ..Default::default()
            },
        )
    }

    fn expression(generator: &Generator, predicate: &Predicate) -> String {
        let source = generator.render_classifier("f", predicate).unwrap();
        let start = source.find("\treturn\n\t\t").unwrap() + "\treturn\n\t\t".len();
        let end = source.rfind("\n\t;\n").unwrap();
        source[start..end].to_owned()
    }

    #[test]
    fn bit_tests() {
        let g = generator(Language::C, 8, false);
        assert_eq!(expression(&g, &Predicate::bit_test(0xf0, 0, true)), "!(c&0xf0)");
        assert_eq!(expression(&g, &Predicate::bit_test(0xf0, 0, false)), "(c&0xf0)");
        assert_eq!(expression(&g, &Predicate::bit_test(0x0f, 0x35, true)), "((c&0xf)==0x5)");
        assert_eq!(expression(&g, &Predicate::bit_test(0x0f, 0x5, false)), "((c&0xf)!=0x5)");
        assert_eq!(expression(&g, &Predicate::bit_test(0xff, 0x41, true)), "(c==0x41)");
        assert_eq!(expression(&g, &Predicate::bit_test(0xff, 0, true)), "!(c)");
        assert_eq!(expression(&g, &Predicate::bit_test(0, 0x41, true)), "1");
        assert_eq!(expression(&g, &Predicate::bit_test(0, 0x41, false)), "0");
    }

    #[test]
    fn constants_per_language() {
        let c = generator(Language::C, 32, false);
        let cpp = generator(Language::Cpp, 32, false);
        assert_eq!(expression(&c, &Predicate::Constant(true)), "1");
        assert_eq!(expression(&cpp, &Predicate::Constant(true)), "true");
        assert_eq!(expression(&cpp, &Predicate::Constant(false)), "false");
    }

    #[test]
    fn compound_layout() {
        let g = generator(Language::Cpp, 8, false);
        let p = Predicate::and(
            Predicate::bit_test(0xc0, 0, true),
            Predicate::or(
                Predicate::bit_test(0xff, 0x3, true),
                Predicate::conditional(
                    0x2,
                    Predicate::bit_test(0x1, 0x1, true),
                    Predicate::Constant(false),
                ),
            ),
        );
        let expr = expression(&g, &p);
        println!("{expr}");
        assert_eq!(
            expr,
            "!(c&0xc0)&&\n\
             \t\t(\t(c==0x3)\n\
             \t\t||\t(!(c&0x2)\n\
             \t\t\t?\tfalse\n\
             \t\t\t:\t((c&0x1)==0x1)\n\
             \t\t\t)\n\
             \t\t)"
        );
    }

    #[test]
    fn profiled_expression() {
        let g = generator(Language::C, 8, true);
        let p = Predicate::or(
            Predicate::bit_test(0xf0, 0, true),
            Predicate::and(Predicate::bit_test(0x1, 0, true), Predicate::Constant(true)),
        );
        let expr = expression(&g, &p);
        assert_eq!(expr, "(\tJO(!(c&0xf0))\n\t\t||\tJR(JA(!(c&0x1))&&\n\t\t\tJR(1))\n\t\t)");

        let source = g.render_classifier("uniclass_Lu", &p).unwrap();
        println!("{source}");
        assert!(source.starts_with("// Autogenerated by uniclass"));
        assert!(source.contains("#define JA(x) inct() && (x) && dect()"));
        assert!(source.contains("int uniclass_Lu(uint32_t c)\n{\n\tprofiler_reset();\n"));
    }

    #[test]
    fn test_source() {
        let g = generator(Language::C, 8, false);
        let values = (0..10).map(|i| i * 3).collect::<Vec<_>>();
        let source = g.render_test("uniclass_X", &values).unwrap();
        println!("{source}");
        assert!(source.contains(
            "uint32_t codes[] = {\n\t\t0x0,0x3,0x6,0x9,0xc,0xf,0x12,0x15,\n\t\t0x18,0x1b\n\t};"
        ));
        assert!(source.contains("n = 10;"));
        assert!(source.contains("i <= 0xff;"));
        assert!(source.contains("if (uniclass_X(c) != b)"));

        let source = generator(Language::Cpp, 32, false)
            .render_test("uniclass_Y", &[])
            .unwrap();
        assert!(source.contains("uint32_t codes[] = {\n\t\t0\n\t};"));
        assert!(source.contains("n = 0;"));
        assert!(source.contains("i <= 0x10ffff;"));
    }

    #[test]
    fn headers() {
        let mut g = generator(Language::Cpp, 32, true);
        g.classifiers.push(classifier_name("Lu,Ll"));
        g.classifiers.push(classifier_name("Nd"));

        let header = g.render_header().unwrap();
        println!("{header}");
        assert!(header.contains("#ifndef UNICLASS_HPP"));
        assert!(header.contains("bool uniclass_Lu_Ll(uint32_t c);\nbool uniclass_Nd(uint32_t c);"));
        assert!(header.contains("struct Profiler"));

        let header = g.render_test_header().unwrap();
        assert!(header.contains("void test_uniclass_Nd();"));
        assert!(header.contains("\ttest_uniclass_Lu_Ll();\n\ttest_uniclass_Nd();\n"));
    }

    #[test]
    fn names() {
        assert_eq!(classifier_name("Lu"), "uniclass_Lu");
        assert_eq!(classifier_name("Lu,Ll, Lt"), "uniclass_Lu_Ll_Lt");
    }
}
