//! 规则中可用的命名整型常量
//!
//! open(2) / chmod(2) 标志位，Linux x86_64 取值。
//! 标识符解析顺序为宏、常量、字段，常量可出现在任何整型字面量可出现的位置。

/// 按名称查找常量值
pub fn lookup(name: &str) -> Option<i64> {
    let value = match name {
        "O_RDONLY" => 0o0,
        "O_WRONLY" => 0o1,
        "O_RDWR" => 0o2,
        "O_CREAT" => 0o100,
        "O_EXCL" => 0o200,
        "O_NOCTTY" => 0o400,
        "O_TRUNC" => 0o1000,
        "O_APPEND" => 0o2000,
        "O_NONBLOCK" => 0o4000,
        "O_SYNC" => 0o4010000,
        "O_CLOEXEC" => 0o2000000,
        "S_IEXEC" => 0o100,
        "S_IWRITE" => 0o200,
        "S_IREAD" => 0o400,
        "S_ISVTX" => 0o1000,
        "S_ISGID" => 0o2000,
        "S_ISUID" => 0o4000,
        _ => return None,
    };
    Some(value)
}
