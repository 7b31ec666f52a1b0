//! Shared markup builders: the shapes the source-to-markup converter emits
//! for preprocessor directives.

use vartex_core::{Ns, TreeBuilder};

pub fn open_if(b: &mut TreeBuilder, expr: &str, line: usize) {
    b.open(Ns::Cpp, "if", line);
    b.leaf(Ns::Cpp, "directive", line, Some("if"), Some(" "));
    b.leaf(Ns::Src, "expr", line, Some(expr), None);
    b.close();
}

pub fn open_elif(b: &mut TreeBuilder, expr: &str, line: usize) {
    b.open(Ns::Cpp, "elif", line);
    b.leaf(Ns::Cpp, "directive", line, Some("elif"), Some(" "));
    b.leaf(Ns::Src, "expr", line, Some(expr), None);
    b.close();
}

pub fn open_ifdef(b: &mut TreeBuilder, name: &str, line: usize) {
    named_directive(b, "ifdef", name, line);
}

pub fn open_ifndef(b: &mut TreeBuilder, name: &str, line: usize) {
    named_directive(b, "ifndef", name, line);
}

fn named_directive(b: &mut TreeBuilder, tag: &str, name: &str, line: usize) {
    b.open(Ns::Cpp, tag, line);
    b.leaf(Ns::Cpp, "directive", line, Some(tag), Some(" "));
    b.leaf(Ns::Src, "name", line, Some(name), None);
    b.close();
}

pub fn bare_directive(b: &mut TreeBuilder, tag: &str, line: usize) {
    b.open(Ns::Cpp, tag, line);
    b.leaf(Ns::Cpp, "directive", line, Some(tag), None);
    b.close();
}

pub fn define(b: &mut TreeBuilder, text: &str, line: usize) {
    b.open(Ns::Cpp, "define", line);
    b.text(text);
    b.close();
    b.tail("\n");
}
