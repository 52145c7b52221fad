mod diagnostics;
mod loading;
