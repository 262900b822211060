use std::fmt::{Result, Write};

use super::{Backend, ProfilerHook};

/// Plain C99 output.
pub struct C;

impl Backend for C {
    fn source_ext(&self) -> &'static str {
        "c"
    }

    fn header_ext(&self) -> &'static str {
        "h"
    }

    fn bool_type(&self) -> &'static str {
        "int"
    }

    fn constant(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn profiler_hook(&self, hook: ProfilerHook) -> &'static str {
        match hook {
            ProfilerHook::Reset => "profiler_reset",
            ProfilerHook::IncTrue => "inct",
            ProfilerHook::IncFalse => "incf",
            ProfilerHook::DecTrue => "dect",
            ProfilerHook::DecFalse => "decf",
            ProfilerHook::Jumps => "jumps",
        }
    }

    fn write_header_includes(&self, out: &mut String) -> Result {
        out.push_str("#include <stdint.h>\n#include <stdlib.h>\n");
        Ok(())
    }

    fn write_profiler_decls(&self, out: &mut String) -> Result {
        out.push_str(
            "// Profiler methods:\n\
             void profiler_reset();\n\
             int inct();\n\
             int incf();\n\
             int dect();\n\
             int decf();\n\
             int jumps();\n",
        );
        Ok(())
    }

    fn write_profiler_defs(&self, out: &mut String) -> Result {
        out.push_str(
            "#include \"uniclass.h\"\n\n\
             static int j;\n\n\
             void profiler_reset() { j = 0; }\n\
             int inct() { ++j; return 1; }\n\
             int incf() { ++j; return 0; }\n\
             int dect() { --j; return 1; }\n\
             int decf() { --j; return 0; }\n\
             int jumps() { return j; }\n",
        );
        Ok(())
    }

    fn write_test_includes(&self, out: &mut String) -> Result {
        out.push_str(
            "#include <stdio.h>\n\n\
             #define AVG(s,n) (n==0? 0 : ((float)(s)/(n)))\n\n",
        );
        Ok(())
    }

    fn write_test_start(&self, out: &mut String, name: &str, matching: usize) -> Result {
        writeln!(out, "\tprintf(\"\\nTesting {name} (matching {matching}):\\n\");")
    }

    fn write_test_failure(&self, out: &mut String) -> Result {
        writeln!(
            out,
            "\t\t\tprintf(\"Failed test: U+%04x should %smatch\\n\", c, b?\"\":\"not \");"
        )
    }

    fn write_test_summary(&self, out: &mut String, profiler: bool) -> Result {
        writeln!(out, "\tif (failed == 0) printf(\"All %u tests passed!\\n\", i);")?;
        writeln!(out, "\telse printf(\"Failed %u out of %u tests!\\n\", failed, i);")?;
        if profiler {
            writeln!(
                out,
                "\tprintf(\"Jumps per codevalue: total=%.1f, matched=%.1f, unmatched=%.1f, \
                 ascii=%.1f, max=%u\\n\", AVG(match_jumps+unmatched_jumps,i), AVG(match_jumps,n), \
                 AVG(unmatched_jumps,i-n), AVG(ascii_jumps,128), max_jumps);"
            )?;
        }
        Ok(())
    }

    fn write_main(&self, out: &mut String, classifiers: &[String], tests: bool) -> Result {
        out.push_str("#include <stdio.h>\n#include <string.h>\n#include \"uniclass.h\"\n");
        if tests {
            out.push_str("#include \"test_uniclass.h\"\n");
        }
        out.push_str(
            "\nint main(int argc, char * const argv[])\n\
             {\n\
             \tif (argc > 1) for (int i = 1; i < argc; ++i)\n\
             \t{\n\
             \t\twchar_t c;\n\
             \t\tif (mbtowc(&c, argv[i], strlen(argv[i])) > 0)\n\
             \t\t{\n\
             \t\t\tprintf(\"Checking c='%s' (%#x)\\n\", argv[i], (unsigned)c);\n",
        );
        for name in classifiers {
            writeln!(
                out,
                "\t\t\tprintf(\"{name}(c)==%s\\n\", {name}(c) ? \"true\" : \"false\");"
            )?;
        }
        out.push_str("\t\t}\n\t\tprintf(\"\\n\");\n\t}\n");
        if tests {
            out.push_str(
                "\telse\n\
                 \t{\n\
                 \t\ttest();\n\
                 \t\tprintf(\"\\nYou can also enter some characters to check (separated by spaces).\\n\");\n\
                 \t}\n",
            );
        } else {
            out.push_str(
                "\telse printf(\"Please enter some characters to check (separated by spaces).\\n\");\n",
            );
        }
        out.push_str("\treturn 0;\n}\n");
        Ok(())
    }
}
