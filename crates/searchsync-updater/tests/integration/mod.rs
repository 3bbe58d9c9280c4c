mod subsites;
