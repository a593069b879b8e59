/// Console output with optional ANSI colors
#[derive(Clone)]
pub struct Formatter {
    use_colors: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn print_system(&self, msg: &str) {
        if self.use_colors {
            println!("\x1b[33m[voxcable]\x1b[0m {msg}");
        } else {
            println!("[voxcable] {msg}");
        }
    }

    pub fn print_status(&self, msg: &str) {
        if self.use_colors {
            println!("\x1b[36m{msg}\x1b[0m");
        } else {
            println!("{msg}");
        }
    }

    pub fn print_success(&self, msg: &str) {
        if self.use_colors {
            println!("\x1b[32m{msg}\x1b[0m");
        } else {
            println!("{msg}");
        }
    }

    pub fn print_error(&self, msg: &str) {
        if self.use_colors {
            eprintln!("\x1b[31m{msg}\x1b[0m");
        } else {
            eprintln!("{msg}");
        }
    }
}
