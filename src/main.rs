fn main() {
    tabjar::cli::run();
}
