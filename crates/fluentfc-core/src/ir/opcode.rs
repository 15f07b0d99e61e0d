//! Opcode text formatting (§4.G): the compatibility surface with the native
//! back-end. Each function writes exactly the operand shape tabulated there.

/// A value operand: an SSA temporary, a pool address, a block address, or a
/// mangled function/module name — all of these are just opaque text by the
/// time lowering has resolved them.
pub fn temp(index: u32) -> String {
    format!("x{index}")
}

pub fn write_ref(out: &mut String, addr: &str, ty: &str, value: &str) {
    out.push_str("ref ");
    out.push_str(addr);
    out.push(' ');
    out.push_str(ty);
    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

pub fn write_link(out: &mut String, path: &str) {
    out.push_str("link ");
    out.push_str(path);
    out.push('\n');
}

pub fn write_mov(out: &mut String, addr: &str, ty: &str, value: &str) {
    out.push_str("mov ");
    out.push_str(addr);
    out.push(' ');
    out.push_str(ty);
    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

pub fn write_arr_header(out: &mut String, length: usize) {
    out.push_str("arr ");
    out.push_str(&length.to_string());
    out.push(' ');
}

pub fn write_co_header(out: &mut String, mangled_module: &str) {
    out.push_str("co ");
    out.push_str(mangled_module);
    out.push(' ');
}

pub fn write_end_co(out: &mut String) {
    out.push_str("end_co\n");
}

/// `fn` is the mangled callee name, `target` the temp the result moves to
/// (absent for a discarded call result), `args` the already-lowered
/// argument operands, and `(file, line, column)` the trace triple.
pub fn write_call(out: &mut String, function: &str, target: Option<&str>, args: &[String], file: &str, line: &str, column: &str) {
    out.push_str("c ");
    out.push_str(function);
    out.push(' ');
    if let Some(target) = target {
        out.push_str(target);
        out.push(' ');
    }
    for arg in args {
        out.push_str(arg);
        out.push(' ');
    }
    out.push_str(file);
    out.push(' ');
    out.push_str(line);
    out.push(' ');
    out.push_str(column);
    out.push_str(" end_call\n");
}

pub fn write_if(out: &mut String, cond: &str, then_addr: &str, else_addr: &str) {
    out.push_str("if ");
    out.push_str(cond);
    out.push(' ');
    out.push_str(then_addr);
    out.push(' ');
    out.push_str(else_addr);
    out.push('\n');
}

pub fn write_jump(out: &mut String, block_addr: &str) {
    out.push_str("jump ");
    out.push_str(block_addr);
    out.push('\n');
}

pub fn write_ret(out: &mut String, value: &str) {
    out.push_str("ret ");
    out.push_str(value);
    out.push('\n');
}

pub fn write_ret_void(out: &mut String) {
    out.push_str("ret_void\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_line_shape() {
        let mut out = String::new();
        write_ref(&mut out, "__num__0", "num", "1");
        assert_eq!(out, "ref __num__0 num 1\n");
    }

    #[test]
    fn call_line_shape() {
        let mut out = String::new();
        write_call(&mut out, "f__0_1", Some("x2"), &["x0".to_owned(), "x1".to_owned()], "__trace_num__0", "__trace_num__1", "__trace_num__2");
        assert_eq!(out, "c f__0_1 x2 x0 x1 __trace_num__0 __trace_num__1 __trace_num__2 end_call\n");
    }
}
