fn main() {
    preproc::cli::run();
}
