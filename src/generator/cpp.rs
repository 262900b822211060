use std::fmt::{Result, Write};

use super::{Backend, ProfilerHook};

/// C++ output with `bool` classifiers and a static `Profiler`.
pub struct Cpp;

impl Backend for Cpp {
    fn source_ext(&self) -> &'static str {
        "cpp"
    }

    fn header_ext(&self) -> &'static str {
        "hpp"
    }

    fn bool_type(&self) -> &'static str {
        "bool"
    }

    fn constant(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    fn profiler_hook(&self, hook: ProfilerHook) -> &'static str {
        match hook {
            ProfilerHook::Reset => "Profiler::reset",
            ProfilerHook::IncTrue => "Profiler::inct",
            ProfilerHook::IncFalse => "Profiler::incf",
            ProfilerHook::DecTrue => "Profiler::dect",
            ProfilerHook::DecFalse => "Profiler::decf",
            ProfilerHook::Jumps => "Profiler::jumps",
        }
    }

    fn write_header_includes(&self, out: &mut String) -> Result {
        out.push_str("#include <cstdint>\n");
        Ok(())
    }

    fn write_profiler_decls(&self, out: &mut String) -> Result {
        out.push_str(
            "struct Profiler\n\
             {\n\
             \tstatic void reset();\n\
             \tstatic bool inct();\n\
             \tstatic bool incf();\n\
             \tstatic bool dect();\n\
             \tstatic bool decf();\n\
             \tstatic int jumps();\n\
             };\n",
        );
        Ok(())
    }

    fn write_profiler_defs(&self, out: &mut String) -> Result {
        out.push_str(
            "#include \"uniclass.hpp\"\n\n\
             static int j;\n\n\
             void Profiler::reset() { j = 0; }\n\
             bool Profiler::inct() { ++j; return true; }\n\
             bool Profiler::incf() { ++j; return false; }\n\
             bool Profiler::dect() { --j; return true; }\n\
             bool Profiler::decf() { --j; return false; }\n\
             int Profiler::jumps() { return j; }\n",
        );
        Ok(())
    }

    fn write_test_includes(&self, out: &mut String) -> Result {
        out.push_str(
            "#include <iostream>\n\n\
             #define AVG(s,n) (n==0? 0 : ((s)*10/(n)/10.0))\n\n",
        );
        Ok(())
    }

    fn write_test_start(&self, out: &mut String, name: &str, matching: usize) -> Result {
        writeln!(
            out,
            "\tstd::cout << std::hex << std::noshowbase << std::endl \
             << \"Testing {name} (matching {matching}):\" << std::endl;"
        )
    }

    fn write_test_failure(&self, out: &mut String) -> Result {
        writeln!(
            out,
            "\t\t\tstd::cout << \"Failed test: U+\" << c << \" should \" \
             << (b?\"\":\"not \") << \"match\" << std::endl;"
        )
    }

    fn write_test_summary(&self, out: &mut String, profiler: bool) -> Result {
        writeln!(
            out,
            "\tif (failed == 0) std::cout << \"All \" << std::dec << i << \" tests passed!\" << std::endl;"
        )?;
        writeln!(
            out,
            "\telse std::cout << \"Failed \" << std::dec << failed << \" out of \" << i << \" tests!\" << std::endl;"
        )?;
        if profiler {
            out.push_str(
                "\tstd::cout << \"Jumps per codevalue: total=\" << AVG(match_jumps+unmatched_jumps,i)\n\
                 \t\t<< \", matched=\" << AVG(match_jumps,n) << \", unmatched=\" << AVG(unmatched_jumps,i-n)\n\
                 \t\t<< \", ascii=\" << AVG(ascii_jumps,128) << \", max=\" << max_jumps << std::endl;\n",
            );
        }
        Ok(())
    }

    fn write_main(&self, out: &mut String, classifiers: &[String], tests: bool) -> Result {
        out.push_str("#include <cstdlib>\n#include <cstring>\n#include <iostream>\n#include \"uniclass.hpp\"\n");
        if tests {
            out.push_str("#include \"test_uniclass.hpp\"\n");
        }
        out.push_str(
            "\nint main(int argc, char * const argv[])\n\
             {\n\
             \tstd::cout << std::boolalpha << std::hex << std::showbase;\n\
             \tif (argc > 1) for (int i = 1; i < argc; ++i)\n\
             \t{\n\
             \t\twchar_t c;\n\
             \t\tif (std::mbtowc(&c, argv[i], std::strlen(argv[i])) > 0)\n\
             \t\t{\n\
             \t\t\tstd::cout << \"Checking c='\" << argv[i] << \"' (\" << (uint32_t)c << ')' << std::endl;\n",
        );
        for name in classifiers {
            writeln!(
                out,
                "\t\t\tstd::cout << \"{name}(c)==\" << {name}(c) << std::endl;"
            )?;
        }
        out.push_str("\t\t}\n\t\tstd::cout << std::endl;\n\t}\n");
        if tests {
            out.push_str(
                "\telse\n\
                 \t{\n\
                 \t\ttest();\n\
                 \t\tstd::cout << std::endl << \"You can also enter some characters to check (separated by spaces).\" << std::endl;\n\
                 \t}\n",
            );
        } else {
            out.push_str(
                "\telse std::cout << \"Please enter some characters to check (separated by spaces).\" << std::endl;\n",
            );
        }
        out.push_str("\treturn 0;\n}\n");
        Ok(())
    }
}
